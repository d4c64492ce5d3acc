//! HTTP surface of the token engine.
//!
//! Every endpoint takes an `application/x-www-form-urlencoded` body and
//! authenticates the calling client with HTTP Basic auth.

use crate::AppResources;
use crate::email_templates::Email;
use crate::entity::client;
use crate::error::{ErrorBody, OAuthError};
use crate::oauth2::email_token::EmailTokenRequest;
use crate::oauth2::grants::{GrantType, TokenRequest};
use crate::oauth2::introspect::IntrospectRequest;
use crate::oauth2::response::{AccessTokenResponse, IntrospectResponse};
use crate::oauth2::{OAUTH2_TAG, OAuthService};
use axum::{
    Extension, Form, Json,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(service: OAuthService) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(tokens))
        .routes(routes!(introspect))
        .routes(routes!(email_tokens))
        .with_state(service)
}

/// Renders an engine error. 401s carry a `WWW-Authenticate` challenge.
pub fn error_response(realm: &str, err: OAuthError) -> Response {
    let status = err.status_code();
    if err.is_internal() {
        tracing::error!(
            name = "api.oauth.internal_error",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            error = ?err,
            message = "Request failed with an internal error"
        );
    }
    let body = Json(ErrorBody::from(&err));
    if status == StatusCode::UNAUTHORIZED {
        let challenge = HeaderValue::from_str(&format!("Bearer realm={realm}"))
            .unwrap_or_else(|_| HeaderValue::from_static("Bearer"));
        return (status, [(header::WWW_AUTHENTICATE, challenge)], body).into_response();
    }
    (status, body).into_response()
}

/// Client id and secret from an `Authorization: Basic` header. The scheme is
/// matched case-insensitively.
pub fn basic_auth_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = base64::Engine::decode(
        &base64::engine::general_purpose::STANDARD,
        encoded.trim_start(),
    )
    .ok()?;
    let creds = String::from_utf8(decoded).ok()?;
    let (id, secret) = creds.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

/// A missing or non-form body reads as an empty form.
fn form_or_default<T: Default>(form: Result<Form<T>, FormRejection>) -> Result<T, OAuthError> {
    match form {
        Ok(Form(request)) => Ok(request),
        Err(FormRejection::InvalidFormContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(OAuthError::InvalidRequest(rejection.body_text())),
    }
}

/// Every client authentication failure collapses into one error.
async fn basic_auth_client(
    service: &OAuthService,
    headers: &HeaderMap,
) -> Result<client::Model, OAuthError> {
    let (client_id, secret) =
        basic_auth_credentials(headers).ok_or(OAuthError::InvalidClientIdOrSecret)?;
    match service.auth_client(&client_id, &secret).await {
        Ok(client) => Ok(client),
        Err(e) if e.is_internal() => Err(e),
        Err(_) => Err(OAuthError::InvalidClientIdOrSecret),
    }
}

#[utoipa::path(
    post,
    path = "/tokens",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Tokens",
    summary = "Issue tokens for one of the supported grants",
    description = "Issues an access token, and for user grants a refresh token.\n\n\
                   **Supported grant types:**\n\
                   - `authorization_code`: exchange a single-use code (requires `code`, `redirect_uri`)\n\
                   - `password`: resource owner credentials (requires `username`, `password`)\n\
                   - `client_credentials`: a token for the client itself, without refresh token\n\
                   - `refresh_token`: exchange a refresh token; the presented token is replaced\n\n\
                   **Client authentication:** HTTP Basic auth with the client id and secret.",
    request_body(
        content = TokenRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "Token request parameters"
    ),
    responses(
        (status = 200, description = "Tokens issued successfully", body = AccessTokenResponse),
        (status = 400, description = "Invalid grant type, scope, redirect URI or an expired grant", body = ErrorBody),
        (status = 401, description = "Invalid client or user credentials", body = ErrorBody),
        (status = 404, description = "Unknown code or refresh token", body = ErrorBody),
    ),
    security(("BasicAuth" = []))
)]
#[tracing::instrument(skip_all, fields(grant_type = tracing::field::Empty))]
pub async fn tokens(
    State(service): State<OAuthService>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let realm = service.config().realm.clone();

    let request = match form_or_default(form) {
        Ok(request) => request,
        Err(e) => return error_response(&realm, e),
    };
    tracing::Span::current().record("grant_type", request.grant_type.as_str());

    // The grant type is checked before the client so unknown grants fail fast.
    let grant_type = match request.grant_type.parse::<GrantType>() {
        Ok(grant_type) => grant_type,
        Err(e) => return error_response(&realm, e),
    };

    let client = match basic_auth_client(&service, &headers).await {
        Ok(client) => client,
        Err(e) => return error_response(&realm, e),
    };

    match service.grant(grant_type, &client, &request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(&realm, e),
    }
}

#[utoipa::path(
    post,
    path = "/introspect",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Introspect",
    summary = "Describe an access or refresh token",
    description = "Returns the scope, expiry and owner of a token.\n\n\
                   `token_type_hint` selects the token class: `access_token` (default) or `refresh_token`. \
                   Introspecting an access token extends the lifetime of the matching refresh token.",
    request_body(
        content = IntrospectRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "Introspection parameters"
    ),
    responses(
        (status = 200, description = "Token is active", body = IntrospectResponse),
        (status = 400, description = "Missing token, invalid hint or expired token", body = ErrorBody),
        (status = 401, description = "Invalid client credentials", body = ErrorBody),
        (status = 404, description = "Unknown token", body = ErrorBody),
    ),
    security(("BasicAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn introspect(
    State(service): State<OAuthService>,
    headers: HeaderMap,
    form: Result<Form<IntrospectRequest>, FormRejection>,
) -> Response {
    let realm = service.config().realm.clone();

    let client = match basic_auth_client(&service, &headers).await {
        Ok(client) => client,
        Err(e) => return error_response(&realm, e),
    };

    let request = match form_or_default(form) {
        Ok(request) => request,
        Err(e) => return error_response(&realm, e),
    };

    match service.introspect(&client, &request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(&realm, e),
    }
}

#[utoipa::path(
    post,
    path = "/email-tokens",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Email Tokens",
    summary = "Mail a signed single-use link to a registered user",
    description = "Creates an email token and mails a link carrying it to the user.\n\n\
                   **Purposes:**\n\
                   - `password-reset`: link to the password reset page\n\
                   - `email-confirmation`: link to the email confirmation page\n\n\
                   The link is valid for 10 minutes and can be used once.",
    request_body(
        content = EmailTokenRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "Recipient and purpose"
    ),
    responses(
        (status = 202, description = "Email handed to the mail transport"),
        (status = 400, description = "Invalid email address or missing purpose", body = ErrorBody),
        (status = 401, description = "Invalid client credentials", body = ErrorBody),
        (status = 404, description = "No user with that email", body = ErrorBody),
        (status = 500, description = "The mail transport failed", body = ErrorBody),
    ),
    security(("BasicAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn email_tokens(
    State(service): State<OAuthService>,
    Extension(resources): Extension<AppResources>,
    headers: HeaderMap,
    form: Result<Form<EmailTokenRequest>, FormRejection>,
) -> Response {
    let realm = service.config().realm.clone();

    if let Err(e) = basic_auth_client(&service, &headers).await {
        return error_response(&realm, e);
    }

    let request = match form_or_default(form) {
        Ok(request) => request,
        Err(e) => return error_response(&realm, e),
    };
    let Some(purpose) = request.purpose else {
        return error_response(&realm, OAuthError::InvalidRequest("purpose missing".into()));
    };

    let email = Email::new(request.email, purpose);
    let link = service.email_link(purpose);
    match resources
        .mailer
        .send_email_token(&service, &email, &link)
        .await
    {
        Ok(_) => StatusCode::ACCEPTED.into_response(),
        Err(e) => error_response(&realm, e),
    }
}
