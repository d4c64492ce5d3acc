//! OAuth2 token and grant lifecycle engine.
//!
//! `OAuthService` owns the operations; each submodule contributes one concern.
//!
//! ## Supported grants
//!
//! - Authorization Code (single-use codes)
//! - Resource Owner Password
//! - Client Credentials
//! - Refresh Token (rotating)
//!
//! ## Endpoints
//!
//! - `POST /v1/oauth/tokens` - Token endpoint
//! - `POST /v1/oauth/introspect` - Token introspection
//! - `POST /v1/oauth/email-tokens` - Mail a password reset or email confirmation link

pub mod access_token;
pub mod authorization_code;
pub mod client;
pub mod clock;
pub mod email_token;
pub mod endpoints;
pub mod grants;
pub mod introspect;
mod login;
pub mod password;
pub mod refresh_token;
pub mod response;
pub mod role;
pub mod scope;
mod state;
pub mod user;

pub use access_token::UserSession;
pub use client::NewClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use email_token::{EmailTokenClaims, EmailTokenRequest, spawn_email_token_sweep};
pub use endpoints::router;
pub use grants::{GrantType, TokenRequest};
pub use introspect::IntrospectRequest;
pub use password::{hash_password, verify_password};
pub use response::{AccessTokenResponse, IntrospectResponse};
pub use role::AccessRole;
pub use state::OAuthService;

/// OpenAPI tag for OAuth2 endpoints
pub const OAUTH2_TAG: &str = "OAuth2";
