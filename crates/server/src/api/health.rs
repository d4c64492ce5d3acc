//! Health check endpoint.

use crate::AppResources;
use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use sea_orm::{ConnectionTrait, Statement};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Tag for OpenAPI documentation.
pub const MISC_TAG: &str = "Miscellaneous";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub healthy: bool,
}

/// Health check endpoint.
#[tracing::instrument(skip_all)]
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = MISC_TAG,
    operation_id = "Health Check",
    summary = "Service health check",
    description = "Runs a trivial query against the credential store.\n\n\
                   **Use cases:**\n\
                   - Kubernetes liveness/readiness probes\n\
                   - Load balancer health checks",
    responses(
        (status = 200, description = "Database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health(Extension(resources): Extension<AppResources>) -> impl IntoResponse {
    let backend = resources.db.get_database_backend();
    let healthy = match resources
        .db
        .execute(Statement::from_string(backend, "SELECT 1"))
        .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(
                name = "api.health.db_ping_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = ?e,
                message = "Database ping failed"
            );
            false
        }
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(HealthResponse { healthy }))
}
