mod common;

use common::{CLIENT_ID, PASSWORD, USERNAME};
use id_server::entity::{access_token, authorization_code, refresh_token, user};
use id_server::error::OAuthError;
use id_server::oauth2::{AccessRole, NewClient};
use lettre::transport::stub::AsyncStubTransport;
use sea_orm::{EntityTrait, PaginatorTrait};

#[tokio::test]
async fn delete_user_requires_the_password() {
    let fx = common::fixture().await;

    assert!(matches!(
        fx.service.delete_user(&fx.user, "wrong").await,
        Err(OAuthError::InvalidUserPassword)
    ));
    assert!(fx.service.user_exists(USERNAME).await.unwrap());
}

#[tokio::test]
async fn delete_user_removes_account_and_grants() {
    let fx = common::fixture().await;
    let service = &fx.service;
    service.login(&fx.client, &fx.user, "read").await.unwrap();
    service
        .grant_authorization_code(&fx.client, &fx.user, 3600, "", "read")
        .await
        .unwrap();
    // Client-only tokens belong to nobody and survive.
    service
        .grant_access_token(&fx.client, None, 3600, "read")
        .await
        .unwrap();

    service.delete_user(&fx.user, PASSWORD).await.unwrap();

    let db = service.db();
    assert!(!service.user_exists(USERNAME).await.unwrap());
    assert_eq!(user::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(access_token::Entity::find().count(db).await.unwrap(), 1);
    assert_eq!(refresh_token::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(authorization_code::Entity::find().count(db).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_user_without_password_is_refused() {
    let fx = common::fixture().await;
    let nopass = fx
        .service
        .create_user(AccessRole::User, "nopass@example.com", "")
        .await
        .unwrap();

    assert!(matches!(
        fx.service.delete_user(&nopass, "").await,
        Err(OAuthError::UserPasswordNotSet)
    ));
}

#[tokio::test]
async fn update_username_moves_account_and_mails_confirmation() {
    let fx = common::fixture().await;
    let service = &fx.service;
    let confirmed = service.confirm_user_email(USERNAME).await.unwrap();
    let mailer = AsyncStubTransport::new_ok();

    let updated = service
        .update_username(&mailer, &confirmed, "New@Example.com", PASSWORD)
        .await
        .unwrap();

    assert_eq!(updated.id, fx.user.id);
    assert_eq!(updated.username, "new@example.com");
    assert!(!updated.email_confirmed);
    assert!(service.auth_user("new@example.com", PASSWORD).await.is_ok());
    assert!(!service.user_exists(USERNAME).await.unwrap());

    let messages = mailer.messages().await;
    assert_eq!(messages.len(), 1);
    let (envelope, raw) = &messages[0];
    assert_eq!(envelope.to()[0].to_string(), "new@example.com");
    assert!(raw.contains("Subject: Confirm your email address"));
    assert!(raw.contains("https://id.example.org/email-confirmation?token="));
}

#[tokio::test]
async fn update_username_validates_before_changing_anything() {
    let fx = common::fixture().await;
    let service = &fx.service;
    let mailer = AsyncStubTransport::new_ok();
    service
        .create_user(AccessRole::User, "taken@example.com", "x")
        .await
        .unwrap();

    assert!(matches!(
        service.update_username(&mailer, &fx.user, "", PASSWORD).await,
        Err(OAuthError::CannotSetEmptyUsername)
    ));
    assert!(matches!(
        service
            .update_username(&mailer, &fx.user, "not an email", PASSWORD)
            .await,
        Err(OAuthError::EmailInvalid)
    ));
    assert!(matches!(
        service
            .update_username(&mailer, &fx.user, "TAKEN@example.com", PASSWORD)
            .await,
        Err(OAuthError::UsernameTaken)
    ));
    assert!(matches!(
        service
            .update_username(&mailer, &fx.user, "free@example.com", "wrong")
            .await,
        Err(OAuthError::InvalidUserPassword)
    ));

    assert!(service.user_exists(USERNAME).await.unwrap());
    assert!(mailer.messages().await.is_empty());
}

#[tokio::test]
async fn failed_confirmation_mail_keeps_the_new_username() {
    let fx = common::fixture().await;
    let mailer = AsyncStubTransport::new_error();

    let updated = fx
        .service
        .update_username(&mailer, &fx.user, "moved@example.com", PASSWORD)
        .await
        .unwrap();

    assert_eq!(updated.username, "moved@example.com");
    assert!(fx.service.user_exists("moved@example.com").await.unwrap());
}

#[tokio::test]
async fn client_lookup_by_application_url() {
    let fx = common::fixture().await;
    let service = &fx.service;

    let found = service
        .find_client_by_application_url("https://WWW.example.com")
        .await
        .unwrap();
    assert_eq!(found.key, CLIENT_ID);

    assert!(matches!(
        service
            .find_client_by_application_url("https://unknown.example.com")
            .await,
        Err(OAuthError::ClientNotFound)
    ));
}

#[tokio::test]
async fn client_lookup_ignores_hosts_outside_the_origins() {
    let fx = common::fixture().await;
    fx.service
        .create_client(NewClient {
            client_id: "elsewhere",
            secret: "secret",
            application_hostname: "elsewhere.example.net",
            application_url: "https://elsewhere.example.net",
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(matches!(
        fx.service
            .find_client_by_application_url("https://elsewhere.example.net")
            .await,
        Err(OAuthError::ClientNotFound)
    ));
}
