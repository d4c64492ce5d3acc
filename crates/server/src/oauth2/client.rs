//! Client registry and client authentication.

use crate::entity::client;
use crate::error::OAuthError;
use crate::oauth2::OAuthService;
use crate::oauth2::password::hash_password_blocking;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

/// Everything needed to register a client.
#[derive(Clone, Debug, Default)]
pub struct NewClient<'a> {
    pub client_id: &'a str,
    pub secret: &'a str,
    pub redirect_uri: &'a str,
    pub application_name: &'a str,
    pub application_hostname: &'a str,
    pub application_url: &'a str,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl OAuthService {
    /// Case-insensitive lookup by client key.
    pub async fn find_client_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<client::Model, OAuthError> {
        client::Entity::find()
            .filter(client::Column::Key.eq(client_id.to_lowercase()))
            .one(self.db())
            .await?
            .ok_or(OAuthError::ClientNotFound)
    }

    /// The client registered for `application_url`, restricted to clients
    /// whose hostname is one of the configured origins.
    pub async fn find_client_by_application_url(
        &self,
        application_url: &str,
    ) -> Result<client::Model, OAuthError> {
        let origins = self
            .config()
            .origins
            .iter()
            .map(|origin| origin.to_lowercase());
        client::Entity::find()
            .filter(client::Column::ApplicationUrl.eq(application_url.to_lowercase()))
            .filter(client::Column::ApplicationHostname.is_in(origins))
            .one(self.db())
            .await?
            .ok_or(OAuthError::ClientNotFound)
    }

    pub async fn client_exists(&self, client_id: &str) -> Result<bool, OAuthError> {
        match self.find_client_by_client_id(client_id).await {
            Ok(_) => Ok(true),
            Err(OAuthError::ClientNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[tracing::instrument(skip(self, secret))]
    pub async fn auth_client(
        &self,
        client_id: &str,
        secret: &str,
    ) -> Result<client::Model, OAuthError> {
        let client = self.find_client_by_client_id(client_id).await?;
        if !self
            .passwords
            .clone()
            .verify_blocking(secret, &client.secret)
            .await?
        {
            return Err(OAuthError::InvalidClientSecret);
        }
        Ok(client)
    }

    #[tracing::instrument(skip(self, new), fields(client_id = %new.client_id))]
    pub async fn create_client(&self, new: NewClient<'_>) -> Result<client::Model, OAuthError> {
        if self.client_exists(new.client_id).await? {
            return Err(OAuthError::ClientIdTaken);
        }

        let secret = hash_password_blocking(new.secret).await?;
        let now = self.now();
        let client = client::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            key: Set(new.client_id.to_lowercase()),
            secret: Set(secret),
            redirect_uri: Set(non_empty(new.redirect_uri)),
            application_name: Set(non_empty(new.application_name)),
            application_hostname: Set(non_empty(&new.application_hostname.to_lowercase())),
            application_url: Set(non_empty(&new.application_url.to_lowercase())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let client = client.insert(self.db()).await?;
        tracing::info!(client_id = %client.key, "registered oauth client");
        Ok(client)
    }
}
