//! User directory and user authentication.

use crate::email_templates::{Email, EmailTemplate};
use crate::entity::{access_token, authorization_code, refresh_token, user};
use crate::error::OAuthError;
use crate::oauth2::OAuthService;
use crate::oauth2::password::hash_password_blocking;
use crate::oauth2::role::AccessRole;
use lettre::{Address, AsyncTransport};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};

impl OAuthService {
    /// Case-insensitive lookup by username.
    pub async fn find_user_by_username(&self, username: &str) -> Result<user::Model, OAuthError> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username.to_lowercase()))
            .one(self.db())
            .await?
            .ok_or(OAuthError::UserNotFound)
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<user::Model>, OAuthError> {
        Ok(user::Entity::find_by_id(id).one(self.db()).await?)
    }

    pub async fn user_exists(&self, username: &str) -> Result<bool, OAuthError> {
        match self.find_user_by_username(username).await {
            Ok(_) => Ok(true),
            Err(OAuthError::UserNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Creates a user; an empty password leaves the account without one.
    #[tracing::instrument(skip(self, password))]
    pub async fn create_user(
        &self,
        role: AccessRole,
        username: &str,
        password: &str,
    ) -> Result<user::Model, OAuthError> {
        let now = self.now();
        let password = if password.is_empty() {
            None
        } else {
            Some(hash_password_blocking(password).await?)
        };
        let user = user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            role_id: Set(role.id()),
            username: Set(username.to_lowercase()),
            last_password_change: Set(password.as_ref().map(|_| now)),
            password: Set(password),
            email_confirmed: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(user.insert(self.db()).await?)
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn auth_user(&self, username: &str, password: &str) -> Result<user::Model, OAuthError> {
        let user = self.find_user_by_username(username).await?;
        self.verify_user_password(&user, password).await?;
        Ok(user)
    }

    async fn verify_user_password(
        &self,
        user: &user::Model,
        password: &str,
    ) -> Result<(), OAuthError> {
        let Some(hash) = user.password.as_deref().filter(|p| !p.is_empty()) else {
            return Err(OAuthError::UserPasswordNotSet);
        };
        if !self.passwords.clone().verify_blocking(password, hash).await? {
            return Err(OAuthError::InvalidUserPassword);
        }
        Ok(())
    }

    /// Removes the account and every grant it holds once the password checks out.
    #[tracing::instrument(skip(self, user, password), fields(user_id = %user.id))]
    pub async fn delete_user(&self, user: &user::Model, password: &str) -> Result<(), OAuthError> {
        self.verify_user_password(user, password).await?;

        let txn = self.db().begin().await?;
        access_token::Entity::delete_many()
            .filter(access_token::Column::UserId.eq(user.id.as_str()))
            .exec(&txn)
            .await?;
        refresh_token::Entity::delete_many()
            .filter(refresh_token::Column::UserId.eq(user.id.as_str()))
            .exec(&txn)
            .await?;
        authorization_code::Entity::delete_many()
            .filter(authorization_code::Column::UserId.eq(user.id.as_str()))
            .exec(&txn)
            .await?;
        user::Entity::delete_by_id(user.id.clone())
            .exec(&txn)
            .await?;
        txn.commit().await?;

        tracing::info!(user_id = %user.id, "deleted user account");
        Ok(())
    }

    /// Moves the account to a new email address and mails a confirmation link
    /// there. The address is unconfirmed until that link is used; a failed
    /// send is logged and does not undo the change.
    #[tracing::instrument(skip(self, mailer, user, username, password), fields(user_id = %user.id))]
    pub async fn update_username<T>(
        &self,
        mailer: &T,
        user: &user::Model,
        username: &str,
        password: &str,
    ) -> Result<user::Model, OAuthError>
    where
        T: AsyncTransport + Sync,
        T::Error: std::fmt::Display,
    {
        if username.is_empty() {
            return Err(OAuthError::CannotSetEmptyUsername);
        }
        if username.parse::<Address>().is_err() {
            return Err(OAuthError::EmailInvalid);
        }
        if self.user_exists(username).await? {
            return Err(OAuthError::UsernameTaken);
        }
        self.verify_user_password(user, password).await?;

        let mut active: user::ActiveModel = user.clone().into();
        active.username = Set(username.to_lowercase());
        active.email_confirmed = Set(false);
        active.updated_at = Set(self.now());
        let updated = active.update(self.db()).await?;

        let email = Email::new(updated.username.clone(), EmailTemplate::EmailConfirmation);
        let link = self.email_link(EmailTemplate::EmailConfirmation);
        if let Err(e) = self.send_email_token(mailer, &email, &link).await {
            tracing::error!(
                name = "oauth.update_username.confirmation_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                message = "Failed to send email change confirmation"
            );
        }
        Ok(updated)
    }

    /// Stores a fresh hash and stamps the password change.
    #[tracing::instrument(skip(self, user, password), fields(user_id = %user.id))]
    pub async fn set_password(
        &self,
        user: user::Model,
        password: &str,
    ) -> Result<user::Model, OAuthError> {
        let hash = hash_password_blocking(password).await?;
        let now = self.now();
        let mut active: user::ActiveModel = user.into();
        active.password = Set(Some(hash));
        active.updated_at = Set(now);
        active.last_password_change = Set(Some(now));
        Ok(active.update(self.db()).await?)
    }

    pub async fn confirm_user_email(&self, username: &str) -> Result<user::Model, OAuthError> {
        let user = self.find_user_by_username(username).await?;
        let mut active: user::ActiveModel = user.into();
        active.email_confirmed = Set(true);
        active.updated_at = Set(self.now());
        Ok(active.update(self.db()).await?)
    }
}
