//! Registered OAuth2 client.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "oauth_clients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Public client identifier, stored lower-case
    #[sea_orm(unique)]
    pub key: String,
    /// Password hash of the client secret
    #[serde(skip_serializing)]
    pub secret: String,
    pub redirect_uri: Option<String>,
    pub application_name: Option<String>,
    pub application_hostname: Option<String>,
    pub application_url: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
