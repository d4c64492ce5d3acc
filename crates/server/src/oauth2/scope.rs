//! Scope negotiation.
//!
//! Scopes travel as space-delimited strings. A request naming no scope gets
//! the default scope; anything else must consist solely of registered names.

use crate::entity::{refresh_token, scope, user};
use crate::error::OAuthError;
use crate::oauth2::OAuthService;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use std::collections::HashSet;

/// First token of every scope issued to a user.
pub const BASE_SCOPES: [&str; 2] = ["read", "read_write"];

/// True when every token of `requested` also appears in `original`.
pub fn scope_not_greater(requested: &str, original: &str) -> bool {
    let granted: HashSet<&str> = original.split_whitespace().collect();
    requested
        .split_whitespace()
        .all(|token| granted.contains(token))
}

impl OAuthService {
    /// Names of all default-flagged scopes, sorted and space-joined.
    pub async fn get_default_scope(&self) -> Result<String, OAuthError> {
        let defaults = scope::Entity::find()
            .filter(scope::Column::IsDefault.eq(true))
            .all(self.db())
            .await?;
        let mut names: Vec<String> = defaults.into_iter().map(|s| s.scope).collect();
        names.sort();
        Ok(names.join(" "))
    }

    /// Every token must be a registered scope. Repeated tokens fail the check.
    pub async fn scope_exists(&self, requested: &str) -> Result<bool, OAuthError> {
        let tokens: Vec<&str> = requested.split(' ').collect();
        let found = scope::Entity::find()
            .filter(scope::Column::Scope.is_in(tokens.iter().copied()))
            .count(self.db())
            .await?;
        Ok(found == tokens.len() as u64)
    }

    pub async fn get_scope(&self, requested: &str) -> Result<String, OAuthError> {
        if requested.is_empty() {
            return self.get_default_scope().await;
        }
        if self.scope_exists(requested).await? {
            return Ok(requested.to_string());
        }
        Err(OAuthError::InvalidScope)
    }

    /// Replaces everything after the base scope with the user's role name.
    pub async fn update_user_scope_with_role(
        &self,
        user: &user::Model,
        scope: &str,
    ) -> Result<String, OAuthError> {
        let base = scope.split(' ').next().unwrap_or_default();
        if !BASE_SCOPES.contains(&base) {
            return Err(OAuthError::InvalidScopeFormat);
        }
        let role = self.find_role_by_id(user.role_id).await?;
        Ok(format!("{base} {}", role.name))
    }

    /// Scope for a refresh grant: the original scope, or a validated subset of it.
    pub async fn refresh_token_scope(
        &self,
        refresh_token: &refresh_token::Model,
        requested: &str,
    ) -> Result<String, OAuthError> {
        if requested.is_empty() {
            return Ok(refresh_token.scope.clone());
        }
        let scope = self.get_scope(requested).await?;
        if !scope_not_greater(&scope, &refresh_token.scope) {
            return Err(OAuthError::RequestedScopeCannotBeGreater);
        }
        Ok(scope)
    }
}
