use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Every failure the token engine and its endpoints can report.
///
/// Callers branch on the variant; the message is what goes on the wire.
#[derive(Debug, Error)]
pub enum OAuthError {
    // Lookups
    #[error("Client not found")]
    ClientNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Role not found")]
    RoleNotFound,
    #[error("Access token not found")]
    AccessTokenNotFound,
    #[error("Refresh token not found")]
    RefreshTokenNotFound,
    #[error("Authorization code not found")]
    AuthorizationCodeNotFound,
    #[error("this token was not found")]
    EmailTokenNotFound,
    #[error("refresh token does not have valid user")]
    RefreshTokenUserMissing,
    #[error("corresponding user for authorization code not found")]
    AuthorizationCodeUserMissing,

    // Expiry
    #[error("Access token expired")]
    AccessTokenExpired,
    #[error("Refresh token expired")]
    RefreshTokenExpired,
    #[error("Authorization code expired")]
    AuthorizationCodeExpired,

    // Request validation
    #[error("Invalid grant type")]
    InvalidGrantType,
    #[error("Invalid token hint")]
    TokenHintInvalid,
    #[error("Token missing")]
    TokenMissing,
    #[error("Requested scope cannot be greater")]
    RequestedScopeCannotBeGreater,
    #[error("Invalid redirect URI")]
    InvalidRedirectUri,
    #[error("Invalid scope")]
    InvalidScope,
    #[error("invalid scope format")]
    InvalidScopeFormat,
    #[error("this token is invalid or has expired")]
    EmailTokenInvalid,
    #[error("email token link is invalid")]
    InvalidEmailTokenLink,
    #[error("Not a valid email")]
    EmailInvalid,
    #[error("Client ID taken")]
    ClientIdTaken,
    #[error("Cannot set empty username")]
    CannotSetEmptyUsername,
    #[error("Email is not available")]
    UsernameTaken,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Authentication
    #[error("Invalid client secret")]
    InvalidClientSecret,
    #[error("Invalid user password")]
    InvalidUserPassword,
    #[error("User password not set")]
    UserPasswordNotSet,
    #[error("Invalid username or password")]
    InvalidUsernameOrPassword,
    #[error("Invalid client ID or secret")]
    InvalidClientIdOrSecret,

    // Internal
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
    #[error("Token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("Sending email failed: {0}")]
    Mail(String),
}

impl OAuthError {
    pub fn status_code(&self) -> StatusCode {
        use OAuthError::*;
        match self {
            ClientNotFound
            | UserNotFound
            | RoleNotFound
            | AccessTokenNotFound
            | RefreshTokenNotFound
            | AuthorizationCodeNotFound
            | EmailTokenNotFound
            | RefreshTokenUserMissing
            | AuthorizationCodeUserMissing => StatusCode::NOT_FOUND,

            AccessTokenExpired
            | RefreshTokenExpired
            | AuthorizationCodeExpired
            | InvalidGrantType
            | TokenHintInvalid
            | TokenMissing
            | RequestedScopeCannotBeGreater
            | InvalidRedirectUri
            | InvalidScope
            | InvalidScopeFormat
            | EmailTokenInvalid
            | InvalidEmailTokenLink
            | EmailInvalid
            | ClientIdTaken
            | CannotSetEmptyUsername
            | UsernameTaken
            | InvalidRequest(_) => StatusCode::BAD_REQUEST,

            InvalidClientSecret
            | InvalidUserPassword
            | UserPasswordNotSet
            | InvalidUsernameOrPassword
            | InvalidClientIdOrSecret => StatusCode::UNAUTHORIZED,

            Database(_) | PasswordHash(_) | Signing(_) | Mail(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the error hides an internal detail that must not reach clients.
    pub fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Message safe to put in a response body.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&OAuthError> for ErrorBody {
    fn from(err: &OAuthError) -> Self {
        Self {
            error: err.public_message(),
        }
    }
}
