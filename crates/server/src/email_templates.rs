//! Bodies of the emails that carry signed email tokens.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which message a token link is embedded in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EmailTemplate {
    PasswordReset,
    EmailConfirmation,
}

impl EmailTemplate {
    pub fn default_subject(self) -> &'static str {
        match self {
            EmailTemplate::PasswordReset => "Reset your password",
            EmailTemplate::EmailConfirmation => "Confirm your email address",
        }
    }

    /// Path of the page the emailed link opens.
    pub fn link_path(self) -> &'static str {
        match self {
            EmailTemplate::PasswordReset => "password-reset",
            EmailTemplate::EmailConfirmation => "email-confirmation",
        }
    }

    pub fn render_text(self, recipient: &str, link: &str) -> String {
        match self {
            EmailTemplate::PasswordReset => format!(
                r#"Hello,

A password reset was requested for the account {recipient}.

Choose a new password by following the link below (valid for 10 minutes):
{link}

If you did not request this, you can ignore this email.
"#
            ),
            EmailTemplate::EmailConfirmation => format!(
                r#"Hello,

Please confirm that {recipient} is your email address by following the link below (valid for 10 minutes):
{link}

If you did not create an account, you can safely ignore this email.
"#
            ),
        }
    }
}

/// An outgoing token email before the link is known.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Email {
    pub recipient: String,
    pub subject: String,
    pub template: EmailTemplate,
}

impl Email {
    pub fn new(recipient: impl Into<String>, template: EmailTemplate) -> Self {
        Self {
            recipient: recipient.into(),
            subject: template.default_subject().to_string(),
            template,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_reset_body_contains_link() {
        let body = EmailTemplate::PasswordReset
            .render_text("joan@waters.com", "https://id.example.org/reset?token=abc");
        assert!(body.contains("joan@waters.com"));
        assert!(body.contains("https://id.example.org/reset?token=abc"));
    }

    #[test]
    fn new_email_uses_template_subject() {
        let email = Email::new("a@b.c", EmailTemplate::EmailConfirmation);
        assert_eq!(email.subject, "Confirm your email address");
    }
}
