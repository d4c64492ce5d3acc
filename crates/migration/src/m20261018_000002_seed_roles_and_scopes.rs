//! Seeds the well-known roles and the scope directory.
//!
//! `read` is the only default scope. Every role name is also registered as a
//! scope because issued user scopes carry the role as their second token.

use sea_orm_migration::prelude::*;

use crate::m20261018_000001_create_oauth_tables::{OauthRoles, OauthScopes};

const ROLES: [(i32, &str); 6] = [
    (1, "superadmin"),
    (2, "admin"),
    (3, "tenantadmin"),
    (4, "label"),
    (5, "artist"),
    (6, "user"),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut roles = Query::insert()
            .into_table(OauthRoles::Table)
            .columns([OauthRoles::Id, OauthRoles::Name])
            .to_owned();
        for (id, name) in ROLES {
            roles.values_panic([id.into(), name.into()]);
        }
        manager.exec_stmt(roles).await?;

        let mut scopes = Query::insert()
            .into_table(OauthScopes::Table)
            .columns([OauthScopes::Id, OauthScopes::Scope, OauthScopes::IsDefault])
            .to_owned();
        scopes.values_panic(["scope-read".into(), "read".into(), true.into()]);
        scopes.values_panic(["scope-read_write".into(), "read_write".into(), false.into()]);
        for (_, name) in ROLES {
            scopes.values_panic([format!("scope-{name}").into(), name.into(), false.into()]);
        }
        manager.exec_stmt(scopes).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(OauthScopes::Table).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(OauthRoles::Table).to_owned())
            .await?;
        Ok(())
    }
}
