//! An OAuth2 authorization server.
//!
//! Issues, validates, refreshes and introspects bearer tokens for registered
//! clients and a user/role directory, and issues signed single-use tokens for
//! email verification flows.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::mailer::Mailer;

pub mod api;
pub mod config;
pub mod email_templates;
pub mod entity;
pub mod error;
pub mod mailer;
pub mod oauth2;

#[derive(Clone, Debug)]
pub struct AppResources {
    pub db: Arc<DatabaseConnection>,
    pub mailer: Mailer,
    pub config: Arc<AppConfig>,
}
