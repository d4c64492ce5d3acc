//! Signed single-use email tokens (password reset, email confirmation).
//!
//! The user receives an HS256 JWT carrying `{username, reference, exp}`. A token
//! is only honoured when the signature and expiry check out AND a live row
//! with the same reference is still in the store, so deleting the row revokes
//! the link.

use crate::email_templates::{Email, EmailTemplate};
use crate::entity::{email_token, user};
use crate::error::OAuthError;
use crate::oauth2::OAuthService;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::{Address, AsyncTransport, Message};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use time::Duration;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

pub const EMAIL_TOKEN_LIFETIME: Duration = Duration::minutes(10);
/// Rows whose expiry is older than this are swept.
pub const EMAIL_TOKEN_RETENTION: Duration = Duration::days(30);
pub const EMAIL_SEND_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmailTokenClaims {
    pub username: String,
    pub reference: String,
    pub exp: i64,
}

/// Form body of `POST /v1/oauth/email-tokens`.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct EmailTokenRequest {
    /// Address of a registered user
    #[serde(default)]
    pub email: String,
    /// `password-reset` or `email-confirmation`
    #[serde(default)]
    pub purpose: Option<EmailTemplate>,
}

impl OAuthService {
    pub async fn create_email_token(
        &self,
        username: &str,
    ) -> Result<email_token::Model, OAuthError> {
        let now = self.now();
        let token = email_token::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            reference: Set(uuid::Uuid::new_v4().to_string()),
            email_sent: Set(false),
            email_sent_at: Set(None),
            expires_at: Set(now + EMAIL_TOKEN_LIFETIME),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(self.db())
        .await?;
        tracing::debug!(username = %username, reference = %token.reference, "created email token");
        Ok(token)
    }

    pub fn sign_email_token(
        &self,
        username: &str,
        token: &email_token::Model,
    ) -> Result<String, OAuthError> {
        let claims = EmailTokenClaims {
            username: username.to_string(),
            reference: token.reference.clone(),
            exp: token.expires_at.unix_timestamp(),
        };
        let key = EncodingKey::from_secret(self.config().email_token_secret_key.as_bytes());
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &key)?)
    }

    /// Resolves a signed token to its stored record and user.
    pub async fn get_valid_email_token(
        &self,
        signed: &str,
    ) -> Result<(email_token::Model, user::Model), OAuthError> {
        // Expiry is checked against the service clock, not the JWT library's.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let key = DecodingKey::from_secret(self.config().email_token_secret_key.as_bytes());
        let claims = decode::<EmailTokenClaims>(signed, &key, &validation)
            .map_err(|_| OAuthError::EmailTokenInvalid)?
            .claims;
        if self.now().unix_timestamp() > claims.exp {
            return Err(OAuthError::EmailTokenInvalid);
        }

        let token = email_token::Entity::find()
            .filter(email_token::Column::Reference.eq(claims.reference.as_str()))
            .filter(email_token::Column::DeletedAt.is_null())
            .one(self.db())
            .await?
            .ok_or(OAuthError::EmailTokenNotFound)?;

        let user = match self.find_user_by_username(&claims.username).await {
            Ok(user) => user,
            Err(OAuthError::UserNotFound) => return Err(OAuthError::EmailTokenNotFound),
            Err(e) => return Err(e),
        };

        Ok((token, user))
    }

    /// A soft delete keeps the row for auditing but stops the token validating.
    pub async fn delete_email_token(
        &self,
        token: email_token::Model,
        soft: bool,
    ) -> Result<(), OAuthError> {
        if soft {
            let now = self.now();
            let mut active: email_token::ActiveModel = token.into();
            active.deleted_at = Set(Some(now));
            active.updated_at = Set(now);
            active.update(self.db()).await?;
        } else {
            email_token::Entity::delete_by_id(token.id)
                .exec(self.db())
                .await?;
        }
        Ok(())
    }

    /// Hard-deletes tokens that expired more than the retention window ago.
    pub async fn clear_expired_email_tokens(&self) -> Result<u64, OAuthError> {
        let cutoff = self.now() - EMAIL_TOKEN_RETENTION;
        let result = email_token::Entity::delete_many()
            .filter(email_token::Column::ExpiresAt.lt(cutoff))
            .exec(self.db())
            .await?;
        Ok(result.rows_affected)
    }

    /// `https://<hostname>/<page>` for the page a `template` email links to.
    pub fn email_link(&self, template: EmailTemplate) -> String {
        format!("https://{}/{}", self.config().hostname, template.link_path())
    }

    /// Creates a token for a registered user and mails `"{link}?token=<jwt>"`.
    ///
    /// The record is only marked as sent once the transport accepted the
    /// message; a failed send leaves a valid but unsent token behind.
    #[tracing::instrument(skip(self, mailer, email), fields(recipient = %email.recipient))]
    pub async fn send_email_token<T>(
        &self,
        mailer: &T,
        email: &Email,
        link: &str,
    ) -> Result<email_token::Model, OAuthError>
    where
        T: AsyncTransport + Sync,
        T::Error: std::fmt::Display,
    {
        let address: Address = email
            .recipient
            .parse()
            .map_err(|_| OAuthError::EmailInvalid)?;
        self.find_user_by_username(&email.recipient).await?;

        if url::Url::parse(link).is_err() {
            return Err(OAuthError::InvalidEmailTokenLink);
        }

        let token = self.create_email_token(&email.recipient).await?;
        let signed = self.sign_email_token(&email.recipient, &token)?;
        let token_link = format!("{link}?token={signed}");

        let from: Mailbox = self
            .config()
            .smtp
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| OAuthError::Mail(e.to_string()))?;
        let message = Message::builder()
            .from(from)
            .to(Mailbox::new(None, address))
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.template.render_text(&email.recipient, &token_link))
            .map_err(|e| OAuthError::Mail(e.to_string()))?;

        match tokio::time::timeout(EMAIL_SEND_TIMEOUT, mailer.send(message)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::error!(
                    name = "oauth.send_email_token.email_send_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    error = %e,
                    message = "Failed to send email token"
                );
                return Err(OAuthError::Mail(e.to_string()));
            }
            Err(_) => {
                tracing::error!(
                    name = "oauth.send_email_token.email_send_timeout",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    timeout_secs = EMAIL_SEND_TIMEOUT.as_secs(),
                    message = "Timed out sending email token"
                );
                return Err(OAuthError::Mail("timed out".to_string()));
            }
        }

        let now = self.now();
        let mut active: email_token::ActiveModel = token.into();
        active.email_sent = Set(true);
        active.email_sent_at = Set(Some(now));
        active.updated_at = Set(now);
        Ok(active.update(self.db()).await?)
    }
}

/// Periodically sweeps long-expired email tokens.
pub fn spawn_email_token_sweep(
    service: OAuthService,
    period: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match service.clear_expired_email_tokens().await {
                Ok(removed) if removed > 0 => {
                    tracing::info!(removed = removed, "swept expired email tokens");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        name = "oauth.email_token_sweep.failed",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        error = ?e,
                        message = "Email token sweep failed"
                    );
                }
            }
        }
    })
}
