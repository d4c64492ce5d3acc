use crate::entity::role;
use crate::error::OAuthError;
use crate::oauth2::OAuthService;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};

/// The fixed role directory. Ids match the seeded `oauth_roles` rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRole {
    SuperAdmin,
    Admin,
    TenantAdmin,
    Label,
    Artist,
    User,
}

impl AccessRole {
    pub const ALL: [AccessRole; 6] = [
        AccessRole::SuperAdmin,
        AccessRole::Admin,
        AccessRole::TenantAdmin,
        AccessRole::Label,
        AccessRole::Artist,
        AccessRole::User,
    ];

    pub fn id(self) -> i32 {
        match self {
            AccessRole::SuperAdmin => 1,
            AccessRole::Admin => 2,
            AccessRole::TenantAdmin => 3,
            AccessRole::Label => 4,
            AccessRole::Artist => 5,
            AccessRole::User => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AccessRole::SuperAdmin => "superadmin",
            AccessRole::Admin => "admin",
            AccessRole::TenantAdmin => "tenantadmin",
            AccessRole::Label => "label",
            AccessRole::Artist => "artist",
            AccessRole::User => "user",
        }
    }
}

impl OAuthService {
    /// Looks the role up in the store so renamed rows are honoured.
    pub async fn find_role_by_id(&self, id: i32) -> Result<role::Model, OAuthError> {
        role::Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or(OAuthError::RoleNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_one_to_six() {
        let ids: Vec<i32> = AccessRole::ALL.into_iter().map(AccessRole::id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn names_match_scope_tokens() {
        assert_eq!(AccessRole::TenantAdmin.name(), "tenantadmin");
        assert_eq!(AccessRole::SuperAdmin.name(), "superadmin");
    }
}
