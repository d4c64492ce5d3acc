use id_server::AppResources;
use id_server::api::start_webserver;
use id_server::config::load_config_or_panic;
use id_server::mailer::Mailer;
use id_server::oauth2::{OAuthService, spawn_email_token_sweep};
use lettre::{AsyncSmtpTransport, Tokio1Executor, transport::smtp::authentication::Credentials};
use rustls::crypto;
use rustls::crypto::CryptoProvider;
use sea_orm::Database;
use std::sync::Arc;
use tokio::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const EMAIL_TOKEN_SWEEP_PERIOD: Duration = Duration::from_secs(12 * 3600);

fn initialize_standard_tracing() {
    let default_directives = "id_server=info,tower_http=info,sea_orm=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    initialize_standard_tracing();

    let config = Arc::new(load_config_or_panic());

    let ring_provider = crypto::ring::default_provider();
    CryptoProvider::install_default(ring_provider)
        .map_err(|_| color_eyre::eyre::eyre!("Failed to install crypto provider"))?;

    let db = Arc::new(Database::connect(&config.database_url).await?);

    let creds = Credentials::new(config.smtp.username.clone(), config.smtp.password.clone());
    let mailer = Mailer::Smtp(Arc::new(
        AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp.server)?
            .port(config.smtp.port)
            .credentials(creds)
            .build(),
    ));

    let service = OAuthService::new(db.clone(), config.clone());
    tracing::info!(
        access_token_lifetime = config.oauth.access_token_lifetime,
        refresh_token_lifetime = config.oauth.refresh_token_lifetime,
        auth_code_lifetime = config.oauth.auth_code_lifetime,
        "oauth configuration"
    );

    spawn_email_token_sweep(service.clone(), EMAIL_TOKEN_SWEEP_PERIOD);

    let resources = AppResources { db, mailer, config };
    start_webserver(service, resources).await?;
    Ok(())
}
