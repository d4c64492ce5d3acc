use crate::entity::{access_token, refresh_token, user};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const TOKEN_TYPE: &str = "Bearer";

/// Successful token endpoint response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl AccessTokenResponse {
    pub fn new(
        access_token: &access_token::Model,
        refresh_token: Option<&refresh_token::Model>,
        user: Option<&user::Model>,
        expires_in: i64,
    ) -> Self {
        Self {
            user_id: user.map(|u| u.id.clone()),
            access_token: access_token.token.clone(),
            expires_in,
            token_type: TOKEN_TYPE.to_string(),
            scope: access_token.scope.clone(),
            refresh_token: refresh_token.map(|r| r.token.clone()),
        }
    }
}

/// Introspection result for an active token.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct IntrospectResponse {
    pub active: bool,
    pub scope: String,
    pub token_type: String,
    /// Expiry as a unix timestamp
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}
