//! Issuing a token pair for an authenticated user.

use crate::entity::{access_token, client, refresh_token, user};
use crate::error::OAuthError;
use crate::oauth2::OAuthService;

impl OAuthService {
    /// Grants an access token and returns the pair's refresh token.
    ///
    /// The scope is rewritten to `"<read|read_write> <role>"`. If issuing the
    /// refresh token fails the access token already stored is left in place.
    #[tracing::instrument(skip_all, fields(client_id = %client.key, user_id = %user.id))]
    pub async fn login(
        &self,
        client: &client::Model,
        user: &user::Model,
        scope: &str,
    ) -> Result<(access_token::Model, refresh_token::Model), OAuthError> {
        if !self.is_role_allowed(user.role_id) {
            tracing::info!(role_id = user.role_id, "login refused for role");
            return Err(OAuthError::InvalidUsernameOrPassword);
        }

        let scope = self.update_user_scope_with_role(user, scope).await?;
        let lifetimes = self.lifetimes();

        let access_token = self
            .grant_access_token(client, Some(user), lifetimes.access_token_lifetime, &scope)
            .await?;
        let refresh_token = self
            .get_or_create_refresh_token(
                client,
                Some(user),
                lifetimes.refresh_token_lifetime,
                &scope,
            )
            .await?;

        Ok((access_token, refresh_token))
    }
}
