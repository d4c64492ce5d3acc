use goose::prelude::*;
use goose::goose::GooseResponse;
use std::env;

fn client_credentials() -> (String, String) {
    let id = env::var("CLIENT_ID").unwrap_or_else(|_| "test_client_1".to_string());
    let secret = env::var("CLIENT_SECRET").unwrap_or_else(|_| "test_secret".to_string());
    (id, secret)
}

async fn post_with_basic_auth(
    user: &mut GooseUser,
    path: &str,
    form: &[(&str, &str)],
) -> Result<GooseResponse, Box<TransactionError>> {
    let (id, secret) = client_credentials();
    let request_builder = user
        .get_request_builder(&GooseMethod::Post, path)?
        .basic_auth(id, Some(secret))
        .form(form);
    let goose_request = GooseRequest::builder()
        .method(GooseMethod::Post)
        .path(path)
        .set_request_builder(request_builder)
        .build();
    user.request(goose_request).await
}

async fn health_check(user: &mut GooseUser) -> TransactionResult {
    let _goose_metrics = user.get("/v1/health").await?;
    Ok(())
}

async fn client_credentials_grant(user: &mut GooseUser) -> TransactionResult {
    let _goose_metrics = post_with_basic_auth(
        user,
        "/v1/oauth/tokens",
        &[("grant_type", "client_credentials"), ("scope", "read")],
    )
    .await?;
    Ok(())
}

async fn password_grant_then_introspect(user: &mut GooseUser) -> TransactionResult {
    let username = env::var("USERNAME").unwrap_or_else(|_| "test@user.com".to_string());
    let password = env::var("PASSWORD").unwrap_or_else(|_| "test_password".to_string());

    let goose_metrics = post_with_basic_auth(
        user,
        "/v1/oauth/tokens",
        &[
            ("grant_type", "password"),
            ("username", &username),
            ("password", &password),
            ("scope", "read"),
        ],
    )
    .await?;

    let Ok(response) = goose_metrics.response else {
        return Ok(());
    };
    let Ok(body) = response.json::<serde_json::Value>().await else {
        return Ok(());
    };
    let Some(access_token) = body["access_token"].as_str() else {
        return Ok(());
    };

    let _goose_metrics = post_with_basic_auth(
        user,
        "/v1/oauth/introspect",
        &[("token", access_token), ("token_type_hint", "access_token")],
    )
    .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    let (id, _) = client_credentials();
    println!("Client ID for token requests: {id}");

    GooseAttack::initialize()?
        .register_scenario(
            scenario!("HealthCheck").register_transaction(transaction!(health_check)),
        )
        .register_scenario(
            scenario!("TokenGrants")
                .register_transaction(transaction!(client_credentials_grant))
                .register_transaction(transaction!(password_grant_then_introspect)),
        )
        .execute()
        .await?;

    Ok(())
}
