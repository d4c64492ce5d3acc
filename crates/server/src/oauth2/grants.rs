//! Grant flows behind the token endpoint.

use crate::entity::client;
use crate::error::OAuthError;
use crate::oauth2::OAuthService;
use crate::oauth2::response::AccessTokenResponse;
use serde::Deserialize;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantType {
    AuthorizationCode,
    Password,
    ClientCredentials,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::Password => "password",
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

impl FromStr for GrantType {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(GrantType::AuthorizationCode),
            "password" => Ok(GrantType::Password),
            "client_credentials" => Ok(GrantType::ClientCredentials),
            "refresh_token" => Ok(GrantType::RefreshToken),
            _ => Err(OAuthError::InvalidGrantType),
        }
    }
}

/// Form body of `POST /v1/oauth/tokens`. Which fields matter depends on the grant.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// One of `authorization_code`, `password`, `client_credentials`, `refresh_token`
    #[serde(default)]
    pub grant_type: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Space-separated scopes; empty means the default scope
    #[serde(default)]
    pub scope: String,
}

impl OAuthService {
    /// Runs `grant_type` for an already authenticated client.
    #[tracing::instrument(skip_all, fields(grant_type = grant_type.as_str(), client_id = %client.key))]
    pub async fn grant(
        &self,
        grant_type: GrantType,
        client: &client::Model,
        request: &TokenRequest,
    ) -> Result<AccessTokenResponse, OAuthError> {
        match grant_type {
            GrantType::AuthorizationCode => self.authorization_code_grant(client, request).await,
            GrantType::Password => self.password_grant(client, request).await,
            GrantType::ClientCredentials => self.client_credentials_grant(client, request).await,
            GrantType::RefreshToken => self.refresh_token_grant(client, request).await,
        }
    }

    async fn authorization_code_grant(
        &self,
        client: &client::Model,
        request: &TokenRequest,
    ) -> Result<AccessTokenResponse, OAuthError> {
        let (code, user) = self
            .get_valid_authorization_code(&request.code, &request.redirect_uri, client)
            .await?;

        let (access_token, refresh_token) = self.login(client, &user, &code.scope).await?;

        // Single use: the code goes once the pair exists.
        self.delete_authorization_code(&code).await?;

        Ok(AccessTokenResponse::new(
            &access_token,
            Some(&refresh_token),
            Some(&user),
            self.lifetimes().access_token_lifetime,
        ))
    }

    async fn password_grant(
        &self,
        client: &client::Model,
        request: &TokenRequest,
    ) -> Result<AccessTokenResponse, OAuthError> {
        let scope = self.get_scope(&request.scope).await?;

        let user = match self.auth_user(&request.username, &request.password).await {
            Ok(user) => user,
            Err(e) if e.is_internal() => return Err(e),
            Err(_) => return Err(OAuthError::InvalidUsernameOrPassword),
        };

        let (access_token, refresh_token) = self.login(client, &user, &scope).await?;

        Ok(AccessTokenResponse::new(
            &access_token,
            Some(&refresh_token),
            Some(&user),
            self.lifetimes().access_token_lifetime,
        ))
    }

    async fn client_credentials_grant(
        &self,
        client: &client::Model,
        request: &TokenRequest,
    ) -> Result<AccessTokenResponse, OAuthError> {
        let scope = self.get_scope(&request.scope).await?;
        let expires_in = self.lifetimes().access_token_lifetime;

        let access_token = self
            .grant_access_token(client, None, expires_in, &scope)
            .await?;

        Ok(AccessTokenResponse::new(&access_token, None, None, expires_in))
    }

    /// The presented refresh token is replaced by a fresh one, but only once
    /// `login` has issued the new access token.
    async fn refresh_token_grant(
        &self,
        client: &client::Model,
        request: &TokenRequest,
    ) -> Result<AccessTokenResponse, OAuthError> {
        let (refresh_token, user) = self
            .get_valid_refresh_token(&request.refresh_token, client)
            .await?;
        let user = user.ok_or(OAuthError::RefreshTokenUserMissing)?;

        let scope = self.refresh_token_scope(&refresh_token, &request.scope).await?;

        let (access_token, current) = self.login(client, &user, &scope).await?;
        let rotated = if current.id == refresh_token.id {
            self.rotate_refresh_token(&refresh_token, &access_token.scope)
                .await?
        } else {
            current
        };

        Ok(AccessTokenResponse::new(
            &access_token,
            Some(&rotated),
            Some(&user),
            self.lifetimes().access_token_lifetime,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_types_parse() {
        for grant in [
            GrantType::AuthorizationCode,
            GrantType::Password,
            GrantType::ClientCredentials,
            GrantType::RefreshToken,
        ] {
            assert_eq!(grant.as_str().parse::<GrantType>().ok(), Some(grant));
        }
    }

    #[test]
    fn unknown_grant_type_is_rejected() {
        assert!(matches!(
            "implicit".parse::<GrantType>(),
            Err(OAuthError::InvalidGrantType)
        ));
        assert!(matches!(
            "".parse::<GrantType>(),
            Err(OAuthError::InvalidGrantType)
        ));
    }
}
