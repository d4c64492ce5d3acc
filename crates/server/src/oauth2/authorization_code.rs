use crate::entity::{authorization_code, client, user};
use crate::error::OAuthError;
use crate::oauth2::OAuthService;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

impl OAuthService {
    #[tracing::instrument(skip_all, fields(client_id = %client.key, user_id = %user.id))]
    pub async fn grant_authorization_code(
        &self,
        client: &client::Model,
        user: &user::Model,
        expires_in: i64,
        redirect_uri: &str,
        scope: &str,
    ) -> Result<authorization_code::Model, OAuthError> {
        let code = authorization_code::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            client_id: Set(client.id.clone()),
            user_id: Set(user.id.clone()),
            code: Set(OAuthService::generate_token()),
            redirect_uri: Set((!redirect_uri.is_empty()).then(|| redirect_uri.to_string())),
            scope: Set(scope.to_string()),
            expires_at: Set(self.seconds_from_now(expires_in)),
            created_at: Set(self.now()),
        }
        .insert(self.db())
        .await?;
        Ok(code)
    }

    /// Checks a presented code without consuming it.
    ///
    /// A code stored without a redirect URI only matches an empty one.
    pub async fn get_valid_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
        client: &client::Model,
    ) -> Result<(authorization_code::Model, user::Model), OAuthError> {
        let auth_code = authorization_code::Entity::find()
            .filter(authorization_code::Column::ClientId.eq(client.id.as_str()))
            .filter(authorization_code::Column::Code.eq(code))
            .one(self.db())
            .await?
            .ok_or(OAuthError::AuthorizationCodeNotFound)?;

        let user = self
            .find_user_by_id(&auth_code.user_id)
            .await?
            .ok_or(OAuthError::AuthorizationCodeUserMissing)?;

        if redirect_uri != auth_code.redirect_uri.as_deref().unwrap_or_default() {
            return Err(OAuthError::InvalidRedirectUri);
        }

        if auth_code.is_expired(self.now()) {
            return Err(OAuthError::AuthorizationCodeExpired);
        }

        Ok((auth_code, user))
    }

    pub(crate) async fn delete_authorization_code(
        &self,
        code: &authorization_code::Model,
    ) -> Result<(), OAuthError> {
        authorization_code::Entity::delete_by_id(code.id.clone())
            .exec(self.db())
            .await?;
        Ok(())
    }
}
