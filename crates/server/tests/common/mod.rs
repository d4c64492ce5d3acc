//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use axum_test::TestServer;
use base64::Engine;
use id_server::{
    AppResources,
    config::{AppConfig, OAuthConfig, SmtpConfig},
    entity::{client, user},
    mailer::Mailer,
    oauth2::{AccessRole, ManualClock, NewClient, OAuthService},
};
use lettre::transport::stub::AsyncStubTransport;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;

pub const CLIENT_ID: &str = "test_client_1";
pub const CLIENT_SECRET: &str = "test_secret";
pub const REDIRECT_URI: &str = "https://www.example.com";
pub const USERNAME: &str = "test@user.com";
pub const PASSWORD: &str = "test_password";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        listen_addr: "127.0.0.1:0".into(),
        hostname: "id.example.org".into(),
        realm: "id_server".into(),
        email_token_secret_key: "test-email-token-secret-key-0123456789".into(),
        smtp: SmtpConfig {
            server: "localhost".into(),
            port: 25,
            username: "test".into(),
            password: "test".into(),
            from: "noreply@test.example.org".into(),
        },
        oauth: OAuthConfig {
            access_token_lifetime: 3600,
            refresh_token_lifetime: 1_209_600,
            auth_code_lifetime: 3600,
        },
        origins: vec!["www.example.com".into()],
    }
}

/// An in-memory database with the full schema and seeded roles/scopes.
pub async fn test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.expect("connect");
    Migrator::up(&db, None).await.expect("migrate");
    db
}

pub struct Fixture {
    pub service: OAuthService,
    pub clock: ManualClock,
    pub resources: AppResources,
    /// Every message sent through `resources.mailer`
    pub outbox: AsyncStubTransport,
    pub client: client::Model,
    pub user: user::Model,
}

pub async fn fixture() -> Fixture {
    fixture_with_role(AccessRole::User).await
}

/// A service with one client and one user holding `role`.
pub async fn fixture_with_role(role: AccessRole) -> Fixture {
    let db = Arc::new(test_db().await);
    let config = Arc::new(test_config());
    let clock = ManualClock::default();
    let service = OAuthService::with_clock(db.clone(), config.clone(), Arc::new(clock.clone()));

    let client = service
        .create_client(NewClient {
            client_id: CLIENT_ID,
            secret: CLIENT_SECRET,
            redirect_uri: REDIRECT_URI,
            application_name: "Test Application",
            application_hostname: "www.example.com",
            application_url: "https://www.example.com",
        })
        .await
        .expect("create client");
    let user = service
        .create_user(role, USERNAME, PASSWORD)
        .await
        .expect("create user");

    let outbox = AsyncStubTransport::new_ok();
    let resources = AppResources {
        db,
        mailer: Mailer::Stub(outbox.clone()),
        config,
    };

    Fixture {
        service,
        clock,
        resources,
        outbox,
        client,
        user,
    }
}

pub fn test_server(fixture: &Fixture) -> TestServer {
    let app = id_server::api::app(fixture.service.clone(), fixture.resources.clone());
    TestServer::new(app).expect("test server")
}

pub fn basic_auth(id: &str, secret: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{id}:{secret}"));
    format!("Basic {encoded}")
}
