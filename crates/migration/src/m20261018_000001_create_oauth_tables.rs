//! Creates the credential store used by the token engine.
//!
//! Tables:
//! - oauth_roles / oauth_scopes: directory data
//! - oauth_clients / oauth_users: principals that authenticate
//! - oauth_access_tokens / oauth_refresh_tokens / oauth_authorization_codes: grants
//! - email_tokens: single-use out-of-band verification records

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OauthRoles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OauthRoles::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OauthRoles::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OauthScopes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OauthScopes::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OauthScopes::Scope)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(OauthScopes::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OauthClients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OauthClients::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OauthClients::Key)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(OauthClients::Secret).string().not_null())
                    .col(ColumnDef::new(OauthClients::RedirectUri).string().null())
                    .col(ColumnDef::new(OauthClients::ApplicationName).string().null())
                    .col(
                        ColumnDef::new(OauthClients::ApplicationHostname)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(OauthClients::ApplicationUrl).string().null())
                    .col(
                        ColumnDef::new(OauthClients::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthClients::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OauthUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OauthUsers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OauthUsers::RoleId).integer().not_null())
                    .col(
                        ColumnDef::new(OauthUsers::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(OauthUsers::Password).string().null())
                    .col(
                        ColumnDef::new(OauthUsers::EmailConfirmed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(OauthUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthUsers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthUsers::LastPasswordChange)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OauthAccessTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OauthAccessTokens::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OauthAccessTokens::ClientId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OauthAccessTokens::UserId).string().null())
                    .col(
                        ColumnDef::new(OauthAccessTokens::Token)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(OauthAccessTokens::Scope).string().not_null())
                    .col(
                        ColumnDef::new(OauthAccessTokens::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthAccessTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OauthRefreshTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OauthRefreshTokens::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OauthRefreshTokens::ClientId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OauthRefreshTokens::UserId).string().null())
                    .col(
                        ColumnDef::new(OauthRefreshTokens::Token)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(OauthRefreshTokens::Scope)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthRefreshTokens::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthRefreshTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthRefreshTokens::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OauthAuthorizationCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OauthAuthorizationCodes::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorizationCodes::ClientId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorizationCodes::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorizationCodes::Code)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorizationCodes::RedirectUri)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorizationCodes::Scope)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorizationCodes::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthAuthorizationCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EmailTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmailTokens::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EmailTokens::Reference)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(EmailTokens::EmailSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EmailTokens::EmailSentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EmailTokens::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailTokens::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailTokens::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Token lookups are keyed by the (client, user) pair
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth_access_tokens_client_user")
                    .table(OauthAccessTokens::Table)
                    .col(OauthAccessTokens::ClientId)
                    .col(OauthAccessTokens::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth_refresh_tokens_client_user")
                    .table(OauthRefreshTokens::Table)
                    .col(OauthRefreshTokens::ClientId)
                    .col(OauthRefreshTokens::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth_authorization_codes_client_id")
                    .table(OauthAuthorizationCodes::Table)
                    .col(OauthAuthorizationCodes::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_email_tokens_expires_at")
                    .table(EmailTokens::Table)
                    .col(EmailTokens::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_email_tokens_expires_at")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_oauth_authorization_codes_client_id")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_oauth_refresh_tokens_client_user")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_oauth_access_tokens_client_user")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(EmailTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OauthAuthorizationCodes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OauthRefreshTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OauthAccessTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OauthUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OauthClients::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OauthScopes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OauthRoles::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum OauthRoles {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
pub(crate) enum OauthScopes {
    Table,
    Id,
    Scope,
    IsDefault,
}

#[derive(DeriveIden)]
enum OauthClients {
    Table,
    Id,
    Key,
    Secret,
    RedirectUri,
    ApplicationName,
    ApplicationHostname,
    ApplicationUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OauthUsers {
    Table,
    Id,
    RoleId,
    Username,
    Password,
    EmailConfirmed,
    CreatedAt,
    UpdatedAt,
    LastPasswordChange,
}

#[derive(DeriveIden)]
enum OauthAccessTokens {
    Table,
    Id,
    ClientId,
    UserId,
    Token,
    Scope,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OauthRefreshTokens {
    Table,
    Id,
    ClientId,
    UserId,
    Token,
    Scope,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OauthAuthorizationCodes {
    Table,
    Id,
    ClientId,
    UserId,
    Code,
    RedirectUri,
    Scope,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum EmailTokens {
    Table,
    Id,
    Reference,
    EmailSent,
    EmailSentAt,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
