//! Access token issuance and bearer authentication.

use crate::entity::{access_token, client, refresh_token, user};
use crate::error::OAuthError;
use crate::oauth2::OAuthService;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};
use serde::{Deserialize, Serialize};

/// Matches rows owned by `user_id`, or client-only rows when there is no user.
pub(crate) fn owned_by<C: ColumnTrait>(column: C, user_id: Option<&str>) -> SimpleExpr {
    match user_id {
        Some(id) => column.eq(id),
        None => column.is_null(),
    }
}

/// The token pair a logged-in browser session holds.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserSession {
    pub client_id: String,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl OAuthService {
    /// Issues a new access token, pruning the pair's already-expired tokens in
    /// the same transaction.
    #[tracing::instrument(skip_all, fields(client_id = %client.key))]
    pub async fn grant_access_token(
        &self,
        client: &client::Model,
        user: Option<&user::Model>,
        expires_in: i64,
        scope: &str,
    ) -> Result<access_token::Model, OAuthError> {
        let now = self.now();
        let user_id = user.map(|u| u.id.as_str());

        let txn = self.db().begin().await?;

        access_token::Entity::delete_many()
            .filter(access_token::Column::ClientId.eq(client.id.as_str()))
            .filter(owned_by(access_token::Column::UserId, user_id))
            .filter(access_token::Column::ExpiresAt.lte(now))
            .exec(&txn)
            .await?;

        let token = access_token::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            client_id: Set(client.id.clone()),
            user_id: Set(user_id.map(String::from)),
            token: Set(OAuthService::generate_token()),
            scope: Set(scope.to_string()),
            expires_at: Set(self.seconds_from_now(expires_in)),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        // Dropping the transaction on an earlier `?` rolls it back.
        txn.commit().await?;
        Ok(token)
    }

    /// Resolves a bearer token. A valid token slides the expiry of the pair's
    /// refresh token forward to a full refresh lifetime from now.
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(&self, token: &str) -> Result<access_token::Model, OAuthError> {
        let access_token = access_token::Entity::find()
            .filter(access_token::Column::Token.eq(token))
            .one(self.db())
            .await?
            .ok_or(OAuthError::AccessTokenNotFound)?;

        let now = self.now();
        if access_token.is_expired(now) {
            return Err(OAuthError::AccessTokenExpired);
        }

        let increased = self.seconds_from_now(self.lifetimes().refresh_token_lifetime);
        refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::ExpiresAt, Expr::value(increased))
            .col_expr(refresh_token::Column::UpdatedAt, Expr::value(now))
            .filter(refresh_token::Column::ClientId.eq(access_token.client_id.as_str()))
            .filter(owned_by(
                refresh_token::Column::UserId,
                access_token.user_id.as_deref(),
            ))
            .exec(self.db())
            .await?;

        Ok(access_token)
    }

    /// Best-effort logout: deletes every token of the session's (client, user)
    /// pairs. Failures are logged and swallowed.
    #[tracing::instrument(skip_all, fields(username = %session.username))]
    pub async fn clear_user_tokens(&self, session: &UserSession) {
        match refresh_token::Entity::find()
            .filter(refresh_token::Column::Token.eq(session.refresh_token.as_str()))
            .one(self.db())
            .await
        {
            Ok(Some(found)) => {
                let deleted = refresh_token::Entity::delete_many()
                    .filter(refresh_token::Column::ClientId.eq(found.client_id.as_str()))
                    .filter(owned_by(
                        refresh_token::Column::UserId,
                        found.user_id.as_deref(),
                    ))
                    .exec(self.db())
                    .await;
                if let Err(e) = deleted {
                    tracing::warn!(
                        name = "oauth.clear_user_tokens.refresh_delete_failed",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        error = ?e,
                        message = "Failed to delete refresh tokens on logout"
                    );
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(
                name = "oauth.clear_user_tokens.refresh_lookup_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = ?e,
                message = "Failed to look up refresh token on logout"
            ),
        }

        match access_token::Entity::find()
            .filter(access_token::Column::Token.eq(session.access_token.as_str()))
            .one(self.db())
            .await
        {
            Ok(Some(found)) => {
                let deleted = access_token::Entity::delete_many()
                    .filter(access_token::Column::ClientId.eq(found.client_id.as_str()))
                    .filter(owned_by(
                        access_token::Column::UserId,
                        found.user_id.as_deref(),
                    ))
                    .exec(self.db())
                    .await;
                if let Err(e) = deleted {
                    tracing::warn!(
                        name = "oauth.clear_user_tokens.access_delete_failed",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        error = ?e,
                        message = "Failed to delete access tokens on logout"
                    );
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(
                name = "oauth.clear_user_tokens.access_lookup_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = ?e,
                message = "Failed to look up access token on logout"
            ),
        }
    }
}
