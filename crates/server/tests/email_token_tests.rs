mod common;

use axum::http::StatusCode;
use common::{CLIENT_ID, CLIENT_SECRET, USERNAME};
use id_server::email_templates::{Email, EmailTemplate};
use id_server::entity::email_token;
use id_server::error::OAuthError;
use id_server::oauth2::{AccessRole, EmailTokenClaims};
use jsonwebtoken::{EncodingKey, Header, encode};
use lettre::transport::stub::AsyncStubTransport;
use sea_orm::{EntityTrait, PaginatorTrait};
use time::Duration;

const RESET_LINK: &str = "https://id.example.org/reset-password";

#[tokio::test]
async fn signed_token_resolves_to_record_and_user() {
    let fx = common::fixture().await;
    let token = fx.service.create_email_token(USERNAME).await.unwrap();
    assert!(!token.email_sent);
    assert_eq!(token.expires_at, fx.service.now() + Duration::minutes(10));

    let signed = fx.service.sign_email_token(USERNAME, &token).unwrap();
    let (found, user) = fx.service.get_valid_email_token(&signed).await.unwrap();
    assert_eq!(found.id, token.id);
    assert_eq!(user.id, fx.user.id);
}

#[tokio::test]
async fn tampered_or_foreign_tokens_are_invalid() {
    let fx = common::fixture().await;
    let token = fx.service.create_email_token(USERNAME).await.unwrap();
    let signed = fx.service.sign_email_token(USERNAME, &token).unwrap();

    let mut tampered = signed.clone();
    tampered.pop();
    tampered.push(if signed.ends_with('A') { 'B' } else { 'A' });

    let claims = EmailTokenClaims {
        username: USERNAME.to_string(),
        reference: token.reference.clone(),
        exp: token.expires_at.unix_timestamp(),
    };
    let foreign = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret-key-0123456789abcdef"),
    )
    .unwrap();

    for candidate in [tampered.as_str(), foreign.as_str(), "not-a-jwt", ""] {
        assert!(matches!(
            fx.service.get_valid_email_token(candidate).await,
            Err(OAuthError::EmailTokenInvalid)
        ));
    }
}

#[tokio::test]
async fn expired_token_is_invalid() {
    let fx = common::fixture().await;
    let token = fx.service.create_email_token(USERNAME).await.unwrap();
    let signed = fx.service.sign_email_token(USERNAME, &token).unwrap();

    fx.clock.advance(Duration::minutes(11));
    assert!(matches!(
        fx.service.get_valid_email_token(&signed).await,
        Err(OAuthError::EmailTokenInvalid)
    ));
}

#[tokio::test]
async fn deleted_tokens_stop_validating() {
    let fx = common::fixture().await;

    for soft in [true, false] {
        let token = fx.service.create_email_token(USERNAME).await.unwrap();
        let signed = fx.service.sign_email_token(USERNAME, &token).unwrap();
        fx.service.delete_email_token(token.clone(), soft).await.unwrap();

        assert!(matches!(
            fx.service.get_valid_email_token(&signed).await,
            Err(OAuthError::EmailTokenNotFound)
        ));

        let row = email_token::Entity::find_by_id(token.id)
            .one(fx.service.db())
            .await
            .unwrap();
        match row {
            Some(row) => {
                assert!(soft);
                assert!(row.is_deleted());
            }
            None => assert!(!soft),
        }
    }
}

#[tokio::test]
async fn token_for_unknown_user_is_not_found() {
    let fx = common::fixture().await;
    let token = fx.service.create_email_token("ghost@example.com").await.unwrap();
    let signed = fx.service.sign_email_token("ghost@example.com", &token).unwrap();

    assert!(matches!(
        fx.service.get_valid_email_token(&signed).await,
        Err(OAuthError::EmailTokenNotFound)
    ));
}

#[tokio::test]
async fn sweep_removes_only_long_expired_tokens() {
    let fx = common::fixture().await;
    let old = fx.service.create_email_token(USERNAME).await.unwrap();

    fx.clock.advance(Duration::days(31));
    let fresh = fx.service.create_email_token(USERNAME).await.unwrap();

    assert_eq!(fx.service.clear_expired_email_tokens().await.unwrap(), 1);
    let db = fx.service.db();
    assert!(email_token::Entity::find_by_id(old.id).one(db).await.unwrap().is_none());
    assert!(email_token::Entity::find_by_id(fresh.id).one(db).await.unwrap().is_some());

    assert_eq!(fx.service.clear_expired_email_tokens().await.unwrap(), 0);
}

#[tokio::test]
async fn send_email_token_marks_record_sent() {
    let fx = common::fixture().await;
    let mailer = AsyncStubTransport::new_ok();
    let email = Email::new(USERNAME, EmailTemplate::PasswordReset);

    let token = fx
        .service
        .send_email_token(&mailer, &email, RESET_LINK)
        .await
        .unwrap();
    assert!(token.email_sent);
    assert_eq!(token.email_sent_at, Some(fx.service.now()));

    let messages = mailer.messages().await;
    assert_eq!(messages.len(), 1);
    let (envelope, raw) = &messages[0];
    assert_eq!(envelope.to()[0].to_string(), USERNAME);
    assert!(raw.contains("Subject: Reset your password"));

    // The mailed link carries the same signature the service would produce.
    let signed = fx.service.sign_email_token(USERNAME, &token).unwrap();
    let (found, _) = fx.service.get_valid_email_token(&signed).await.unwrap();
    assert_eq!(found.id, token.id);
}

#[tokio::test]
async fn failed_send_leaves_unsent_token() {
    let fx = common::fixture().await;
    let mailer = AsyncStubTransport::new_error();
    let email = Email::new(USERNAME, EmailTemplate::EmailConfirmation);

    let result = fx.service.send_email_token(&mailer, &email, RESET_LINK).await;
    assert!(matches!(result, Err(OAuthError::Mail(_))));

    let tokens = email_token::Entity::find().all(fx.service.db()).await.unwrap();
    assert_eq!(tokens.len(), 1);
    assert!(!tokens[0].email_sent);
}

#[tokio::test]
async fn send_email_token_validates_input() {
    let fx = common::fixture_with_role(AccessRole::Artist).await;
    let mailer = AsyncStubTransport::new_ok();

    let invalid = Email::new("not an email", EmailTemplate::PasswordReset);
    assert!(matches!(
        fx.service.send_email_token(&mailer, &invalid, RESET_LINK).await,
        Err(OAuthError::EmailInvalid)
    ));

    let unknown = Email::new("ghost@example.com", EmailTemplate::PasswordReset);
    assert!(matches!(
        fx.service.send_email_token(&mailer, &unknown, RESET_LINK).await,
        Err(OAuthError::UserNotFound)
    ));

    let email = Email::new(USERNAME, EmailTemplate::PasswordReset);
    assert!(matches!(
        fx.service.send_email_token(&mailer, &email, "not a url").await,
        Err(OAuthError::InvalidEmailTokenLink)
    ));

    assert!(mailer.messages().await.is_empty());
    let stored = email_token::Entity::find().count(fx.service.db()).await.unwrap();
    assert_eq!(stored, 0);
}

const EMAIL_TOKENS: &str = "/v1/oauth/email-tokens";

#[tokio::test]
async fn endpoint_mails_a_password_reset_link() {
    let fx = common::fixture().await;
    let server = common::test_server(&fx);

    let response = server
        .post(EMAIL_TOKENS)
        .authorization(common::basic_auth(CLIENT_ID, CLIENT_SECRET))
        .form(&[("email", USERNAME), ("purpose", "password-reset")])
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    let messages = fx.outbox.messages().await;
    assert_eq!(messages.len(), 1);
    let (envelope, raw) = &messages[0];
    assert_eq!(envelope.to()[0].to_string(), USERNAME);
    assert!(raw.contains("https://id.example.org/password-reset?token="));

    let stored = email_token::Entity::find().all(fx.service.db()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].email_sent);
}

#[tokio::test]
async fn endpoint_rejects_bad_requests() {
    let fx = common::fixture().await;
    let server = common::test_server(&fx);
    let auth = common::basic_auth(CLIENT_ID, CLIENT_SECRET);

    let no_purpose = server
        .post(EMAIL_TOKENS)
        .authorization(auth.clone())
        .form(&[("email", USERNAME)])
        .await;
    no_purpose.assert_status_bad_request();

    let unknown_purpose = server
        .post(EMAIL_TOKENS)
        .authorization(auth.clone())
        .form(&[("email", USERNAME), ("purpose", "newsletter")])
        .await;
    unknown_purpose.assert_status_bad_request();

    let unknown_user = server
        .post(EMAIL_TOKENS)
        .authorization(auth)
        .form(&[("email", "ghost@example.com"), ("purpose", "email-confirmation")])
        .await;
    unknown_user.assert_status_not_found();

    let unauthenticated = server
        .post(EMAIL_TOKENS)
        .form(&[("email", USERNAME), ("purpose", "password-reset")])
        .await;
    unauthenticated.assert_status(StatusCode::UNAUTHORIZED);

    assert!(fx.outbox.messages().await.is_empty());
}
