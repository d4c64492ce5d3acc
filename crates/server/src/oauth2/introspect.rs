use crate::entity::client;
use crate::error::OAuthError;
use crate::oauth2::OAuthService;
use crate::oauth2::response::{IntrospectResponse, TOKEN_TYPE};
use sea_orm::EntityTrait;
use serde::Deserialize;
use time::OffsetDateTime;
use utoipa::ToSchema;

pub const ACCESS_TOKEN_HINT: &str = "access_token";
pub const REFRESH_TOKEN_HINT: &str = "refresh_token";

/// Form body of `POST /v1/oauth/introspect`.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct IntrospectRequest {
    #[serde(default)]
    pub token: String,
    /// `access_token` (default) or `refresh_token`
    #[serde(default)]
    pub token_type_hint: String,
}

impl OAuthService {
    /// Describes a token for the authenticated `client`.
    ///
    /// Access tokens go through [`OAuthService::authenticate`] and so extend
    /// their refresh token as a side effect.
    #[tracing::instrument(skip_all, fields(client_id = %client.key, hint = %request.token_type_hint))]
    pub async fn introspect(
        &self,
        client: &client::Model,
        request: &IntrospectRequest,
    ) -> Result<IntrospectResponse, OAuthError> {
        if request.token.is_empty() {
            return Err(OAuthError::TokenMissing);
        }

        let hint = if request.token_type_hint.is_empty() {
            ACCESS_TOKEN_HINT
        } else {
            request.token_type_hint.as_str()
        };

        let (client_id, user_id, scope, expires_at) = match hint {
            ACCESS_TOKEN_HINT => {
                let token = self.authenticate(&request.token).await?;
                (token.client_id, token.user_id, token.scope, token.expires_at)
            }
            REFRESH_TOKEN_HINT => {
                let (token, _) = self.get_valid_refresh_token(&request.token, client).await?;
                (token.client_id, token.user_id, token.scope, token.expires_at)
            }
            _ => return Err(OAuthError::TokenHintInvalid),
        };

        self.describe_token(&client_id, user_id.as_deref(), scope, expires_at)
            .await
    }

    async fn describe_token(
        &self,
        client_id: &str,
        user_id: Option<&str>,
        scope: String,
        expires_at: OffsetDateTime,
    ) -> Result<IntrospectResponse, OAuthError> {
        let owner = client::Entity::find_by_id(client_id)
            .one(self.db())
            .await?
            .ok_or(OAuthError::ClientNotFound)?;

        let user = match user_id {
            Some(id) => Some(
                self.find_user_by_id(id)
                    .await?
                    .ok_or(OAuthError::UserNotFound)?,
            ),
            None => None,
        };

        Ok(IntrospectResponse {
            active: true,
            scope,
            token_type: TOKEN_TYPE.to_string(),
            exp: expires_at.unix_timestamp(),
            client_id: Some(owner.key),
            user_id: user.as_ref().map(|u| u.id.clone()),
            username: user.map(|u| u.username),
        })
    }
}
