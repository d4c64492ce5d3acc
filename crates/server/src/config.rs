use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Lifetimes, in seconds, of everything the token engine issues.
#[derive(Clone, Debug, Deserialize)]
pub struct OAuthConfig {
    #[serde(default = "default_access_token_lifetime")]
    pub access_token_lifetime: i64,
    #[serde(default = "default_refresh_token_lifetime")]
    pub refresh_token_lifetime: i64,
    #[serde(default = "default_auth_code_lifetime")]
    pub auth_code_lifetime: i64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime: default_access_token_lifetime(),
            refresh_token_lifetime: default_refresh_token_lifetime(),
            auth_code_lifetime: default_auth_code_lifetime(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Public hostname, used when building links sent to users.
    pub hostname: String,
    /// Realm advertised in `WWW-Authenticate` challenges.
    #[serde(default = "default_realm")]
    pub realm: String,
    /// HS256 key for signed email tokens.
    pub email_token_secret_key: String,
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    /// Application hostnames whose clients may be looked up by URL.
    #[serde(default)]
    pub origins: Vec<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_realm() -> String {
    "id_server".to_string()
}

fn default_access_token_lifetime() -> i64 {
    3600
}

fn default_refresh_token_lifetime() -> i64 {
    1_209_600 // 14 days
}

fn default_auth_code_lifetime() -> i64 {
    3600
}

impl AppConfig {
    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.email_token_secret_key.len() < 32 {
            return Err(ConfigError::Validation(
                "email_token_secret_key must be at least 32 characters".into(),
            ));
        }
        if self.smtp.port == 0 {
            return Err(ConfigError::Validation("smtp.port must be > 0".into()));
        }
        let lifetimes = [
            ("oauth.access_token_lifetime", self.oauth.access_token_lifetime),
            ("oauth.refresh_token_lifetime", self.oauth.refresh_token_lifetime),
            ("oauth.auth_code_lifetime", self.oauth.auth_code_lifetime),
        ];
        for (key, value) in lifetimes {
            if value <= 0 {
                return Err(ConfigError::Validation(format!("{key} must be > 0")));
            }
        }
        Ok(())
    }
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Any environment variable matching the key path separated by double
/// underscores (e.g. `OAUTH__ACCESS_TOKEN_LIFETIME`) overrides the file value.
/// `ORIGINS` takes a comma-separated list.
/// A `.env` file, if present, is loaded into the environment first.
///
/// Returns a `ConfigError` instead of panicking so the caller can decide how to fail.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let _ = dotenvy::dotenv();
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml").required(false))
        .add_source(
            Environment::default()
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("origins"),
        )
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".into(),
            listen_addr: default_listen_addr(),
            hostname: "id.example.org".into(),
            realm: default_realm(),
            email_token_secret_key: "0123456789abcdef0123456789abcdef".into(),
            smtp: SmtpConfig {
                server: "localhost".into(),
                port: 25,
                username: "test".into(),
                password: "test".into(),
                from: "noreply@example.org".into(),
            },
            oauth: OAuthConfig::default(),
            origins: vec!["www.example.com".into()],
        }
    }

    #[test]
    fn sample_config_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn short_secret_is_rejected() {
        let mut cfg = sample();
        cfg.email_token_secret_key = "too-short".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_smtp_port_is_rejected() {
        let mut cfg = sample();
        cfg.smtp.port = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn non_positive_lifetime_is_rejected() {
        let mut cfg = sample();
        cfg.oauth.refresh_token_lifetime = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("oauth.refresh_token_lifetime"));
    }

    #[test]
    fn oauth_defaults() {
        let oauth = OAuthConfig::default();
        assert_eq!(oauth.access_token_lifetime, 3600);
        assert_eq!(oauth.refresh_token_lifetime, 1_209_600);
        assert_eq!(oauth.auth_code_lifetime, 3600);
    }
}
