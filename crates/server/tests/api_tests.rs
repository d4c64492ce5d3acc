mod common;

use serde_json::Value;

#[tokio::test]
async fn health_reports_reachable_database() {
    let fx = common::fixture().await;
    let server = common::test_server(&fx);

    let response = server.get("/v1/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["healthy"], true);
}

#[tokio::test]
async fn api_docs_are_served() {
    let fx = common::fixture().await;
    let server = common::test_server(&fx);

    let response = server.get("/api-docs").await;

    response.assert_status_ok();
    assert!(response.text().contains("ID Server API"));
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let fx = common::fixture().await;
    let server = common::test_server(&fx);

    server.get("/v1/oauth/authorize").await.assert_status_not_found();
}
