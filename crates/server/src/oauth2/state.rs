//! The token engine's shared state.
//!
//! `OAuthService` is built once at start-up and cloned into every handler.
//! Each concern (clients, users, scopes, tokens, email tokens) adds its
//! operations to it in its own module.

use crate::config::{AppConfig, OAuthConfig};
use crate::oauth2::clock::{Clock, SystemClock};
use crate::oauth2::password::PasswordVerifier;
use crate::oauth2::role::AccessRole;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

#[derive(Clone)]
pub struct OAuthService {
    pub(crate) db: Arc<DatabaseConnection>,
    pub(crate) config: Arc<AppConfig>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) passwords: Arc<PasswordVerifier>,
    allowed_roles: Vec<AccessRole>,
}

impl OAuthService {
    pub fn new(db: Arc<DatabaseConnection>, config: Arc<AppConfig>) -> Self {
        Self::with_clock(db, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            config,
            clock,
            passwords: Arc::new(PasswordVerifier::default()),
            allowed_roles: AccessRole::ALL.to_vec(),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        self.config.as_ref()
    }

    pub(crate) fn lifetimes(&self) -> &OAuthConfig {
        &self.config.oauth
    }

    /// Truncated to whole seconds so stored timestamps also order correctly as
    /// RFC 3339 text on SQLite.
    pub fn now(&self) -> OffsetDateTime {
        let now = self.clock.now();
        now - Duration::nanoseconds(i64::from(now.nanosecond()))
    }

    pub(crate) fn seconds_from_now(&self, seconds: i64) -> OffsetDateTime {
        self.now() + Duration::seconds(seconds)
    }

    /// Only users holding one of `roles` may log in from now on.
    pub fn restrict_to_roles(&mut self, roles: &[AccessRole]) {
        self.allowed_roles = roles.to_vec();
    }

    pub fn is_role_allowed(&self, role_id: i32) -> bool {
        self.allowed_roles.iter().any(|role| role.id() == role_id)
    }

    /// Generate a secure random token
    pub fn generate_token() -> String {
        use base64::Engine;
        let mut bytes = [0u8; 32];
        getrandom::fill(&mut bytes).expect("Failed to generate random bytes");
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }
}
