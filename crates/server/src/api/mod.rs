//! API module providing the HTTP endpoints.
//!
//! - `health` - Health check endpoint (/v1/health)
//! - `openapi` - OpenAPI/Utoipa configuration
//!
//! The OAuth2 endpoints live in [`crate::oauth2::endpoints`] and are nested
//! under `/v1/oauth`.

pub mod health;
pub mod openapi;

pub use health::MISC_TAG;

use crate::AppResources;
use crate::oauth2::{self, OAuthService};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Builds the full application router with its OpenAPI docs at `/api-docs`.
pub fn app(service: OAuthService, app_resources: AppResources) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .nest("/v1/oauth", oauth2::router(service))
        .routes(routes!(health::health))
        .layer(axum::Extension(app_resources))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    router.merge(Redoc::with_url("/api-docs", api))
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(service, app_resources))]
pub async fn start_webserver(
    service: OAuthService,
    app_resources: AppResources,
) -> color_eyre::Result<()> {
    let addr = app_resources.config.listen_addr.clone();
    let router = app(service, app_resources);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");
    axum::serve(listener, router)
        .await
        .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
