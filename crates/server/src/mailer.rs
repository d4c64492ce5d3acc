//! Outgoing mail transport shared by the HTTP handlers.

use std::sync::Arc;

use lettre::transport::stub::AsyncStubTransport;
use lettre::{AsyncSmtpTransport, Tokio1Executor};

use crate::email_templates::Email;
use crate::entity::email_token;
use crate::error::OAuthError;
use crate::oauth2::OAuthService;

#[derive(Clone, Debug)]
pub enum Mailer {
    Smtp(Arc<AsyncSmtpTransport<Tokio1Executor>>),
    /// Records messages instead of delivering them.
    Stub(AsyncStubTransport),
}

impl Mailer {
    pub async fn send_email_token(
        &self,
        service: &OAuthService,
        email: &Email,
        link: &str,
    ) -> Result<email_token::Model, OAuthError> {
        match self {
            Mailer::Smtp(transport) => {
                service
                    .send_email_token(transport.as_ref(), email, link)
                    .await
            }
            Mailer::Stub(transport) => service.send_email_token(transport, email, link).await,
        }
    }
}
