//! Refresh tokens: at most one live token per (client, user) pair.

use crate::entity::{client, refresh_token, user};
use crate::error::OAuthError;
use crate::oauth2::OAuthService;
use crate::oauth2::access_token::owned_by;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};

impl OAuthService {
    /// Returns the pair's live refresh token, replacing it if it has expired.
    ///
    /// The find and the insert are not one transaction; two concurrent logins
    /// for the same pair can both insert.
    #[tracing::instrument(skip_all, fields(client_id = %client.key))]
    pub async fn get_or_create_refresh_token(
        &self,
        client: &client::Model,
        user: Option<&user::Model>,
        expires_in: i64,
        scope: &str,
    ) -> Result<refresh_token::Model, OAuthError> {
        let user_id = user.map(|u| u.id.as_str());

        let existing = refresh_token::Entity::find()
            .filter(refresh_token::Column::ClientId.eq(client.id.as_str()))
            .filter(owned_by(refresh_token::Column::UserId, user_id))
            .one(self.db())
            .await?;

        let now = self.now();
        match existing {
            Some(token) if !token.is_expired(now) => return Ok(token),
            Some(expired) => {
                refresh_token::Entity::delete_by_id(expired.id)
                    .exec(self.db())
                    .await?;
            }
            None => {}
        }

        let token = self
            .new_refresh_token(&client.id, user_id, expires_in, scope)
            .insert(self.db())
            .await?;
        Ok(token)
    }

    /// Swaps `old` for a fresh token of the same pair in one transaction.
    #[tracing::instrument(skip_all, fields(client_id = %old.client_id))]
    pub(crate) async fn rotate_refresh_token(
        &self,
        old: &refresh_token::Model,
        scope: &str,
    ) -> Result<refresh_token::Model, OAuthError> {
        let expires_in = self.lifetimes().refresh_token_lifetime;
        let txn = self.db().begin().await?;

        refresh_token::Entity::delete_by_id(old.id.clone())
            .exec(&txn)
            .await?;
        let token = self
            .new_refresh_token(&old.client_id, old.user_id.as_deref(), expires_in, scope)
            .insert(&txn)
            .await?;

        txn.commit().await?;
        Ok(token)
    }

    fn new_refresh_token(
        &self,
        client_id: &str,
        user_id: Option<&str>,
        expires_in: i64,
        scope: &str,
    ) -> refresh_token::ActiveModel {
        let now = self.now();
        refresh_token::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            client_id: Set(client_id.to_string()),
            user_id: Set(user_id.map(String::from)),
            token: Set(OAuthService::generate_token()),
            scope: Set(scope.to_string()),
            expires_at: Set(self.seconds_from_now(expires_in)),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    /// Resolves a refresh token presented by `client`, with its user.
    pub async fn get_valid_refresh_token(
        &self,
        token: &str,
        client: &client::Model,
    ) -> Result<(refresh_token::Model, Option<user::Model>), OAuthError> {
        let refresh_token = refresh_token::Entity::find()
            .filter(refresh_token::Column::ClientId.eq(client.id.as_str()))
            .filter(refresh_token::Column::Token.eq(token))
            .one(self.db())
            .await?
            .ok_or(OAuthError::RefreshTokenNotFound)?;

        if refresh_token.is_expired(self.now()) {
            return Err(OAuthError::RefreshTokenExpired);
        }

        let user = match refresh_token.user_id.as_deref() {
            Some(user_id) => Some(
                self.find_user_by_id(user_id)
                    .await?
                    .ok_or(OAuthError::RefreshTokenUserMissing)?,
            ),
            None => None,
        };

        Ok((refresh_token, user))
    }
}
