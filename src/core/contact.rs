//! Contact form - validates a visitor's message and emails it to the shop.

use crate::{
    config::AppConfig,
    errors::{Error, Result},
    notify::{Email, Mailer, templates},
};
use serde::Deserialize;
use tracing::{info, instrument};

const NAME_CHARS: std::ops::RangeInclusive<usize> = 2..=100;
const PHONE_CHARS: std::ops::RangeInclusive<usize> = 8..=20;
const MAX_MESSAGE_CHARS: usize = 1000;

/// A contact form submission. Spanish field names from the legacy storefront are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContactMessage {
    #[serde(default, alias = "nombre")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "telefono")]
    pub phone: String,
    #[serde(default, alias = "mensaje")]
    pub message: Option<String>,
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

impl ContactMessage {
    /// Trims every field and checks it, reporting all problems at once.
    ///
    /// # Errors
    /// Returns a validation error listing every invalid field, joined with `". "`.
    pub fn validate(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        let phone = self.phone.trim().to_string();
        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        let message = self
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let mut problems = Vec::new();
        if !NAME_CHARS.contains(&name.chars().count()) {
            problems.push(format!(
                "Name must be between {} and {} characters",
                NAME_CHARS.start(),
                NAME_CHARS.end()
            ));
        }
        let phone_chars_ok = phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')'));
        if !PHONE_CHARS.contains(&phone.chars().count()) || !phone_chars_ok {
            problems.push(format!(
                "Phone must be {} to {} digits, spaces or -+() characters",
                PHONE_CHARS.start(),
                PHONE_CHARS.end()
            ));
        }
        if email.as_deref().is_some_and(|e| !looks_like_email(e)) {
            problems.push("Email address is not valid".to_string());
        }
        if message
            .as_deref()
            .is_some_and(|m| m.chars().count() > MAX_MESSAGE_CHARS)
        {
            problems.push(format!(
                "Message cannot be longer than {MAX_MESSAGE_CHARS} characters"
            ));
        }

        if !problems.is_empty() {
            return Err(Error::validation(problems.join(". ")));
        }
        Ok(Self {
            name,
            email,
            phone,
            message,
        })
    }
}

/// Validates the message and emails it to the shop inbox. Unlike order notifications the
/// result of the delivery is returned to the caller.
///
/// # Errors
/// Returns a validation error for invalid input, or [`Error::ExternalService`] if the email
/// could not be delivered.
#[instrument(skip_all)]
pub async fn send_contact_message(
    mailer: &dyn Mailer,
    config: &AppConfig,
    message: ContactMessage,
) -> Result<()> {
    let message = message.validate()?;
    if config.email.to.trim().is_empty() {
        return Err(Error::ExternalService {
            service: "email",
            message: "no recipient is configured".to_string(),
        });
    }

    let (subject, html) = templates::contact_email(&message, &config.shop.name);
    mailer
        .send(Email {
            to: config.email.to.clone(),
            subject,
            html,
        })
        .await?;
    info!("Contact message from {} delivered", message.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::RecordingMailer;

    fn message(name: &str, phone: &str) -> ContactMessage {
        ContactMessage {
            name: name.to_string(),
            email: None,
            phone: phone.to_string(),
            message: Some("Hacen tortas sin TACC?".to_string()),
        }
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.email.to = "shop@example.com".to_string();
        config
    }

    #[test]
    fn test_valid_message_is_trimmed() {
        let mut input = message("  Ana  ", " +54 (11) 2233-4455 ");
        input.email = Some("  ".to_string());
        let valid = input.validate().unwrap();
        assert_eq!(valid.name, "Ana");
        assert_eq!(valid.phone, "+54 (11) 2233-4455");
        assert_eq!(valid.email, None);
    }

    #[test]
    fn test_all_problems_are_reported() {
        let mut input = message("A", "12ab");
        input.email = Some("not-an-email".to_string());
        input.message = Some("x".repeat(1001));

        let Err(Error::Validation { message }) = input.validate() else {
            unreachable!("expected a validation error");
        };
        assert_eq!(message.split(". ").count(), 4);
        assert!(message.starts_with("Name must be"));
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("ana@example.com"));
        assert!(looks_like_email("ana.perez@mail.example.com.ar"));
        assert!(!looks_like_email("ana@example"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("ana@@example.com"));
        assert!(!looks_like_email("ana @example.com"));
        assert!(!looks_like_email("ana@example..com"));
    }

    #[test]
    fn test_accepts_legacy_field_names() {
        let json = r#"{"nombre":"Ana","telefono":"1122334455","mensaje":"Hola"}"#;
        let parsed: ContactMessage = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.name, "Ana");
        assert_eq!(parsed.message.as_deref(), Some("Hola"));
    }

    #[tokio::test]
    async fn test_send_contact_message() -> Result<()> {
        let mailer = RecordingMailer::default();
        send_contact_message(&mailer, &config(), message("Ana", "1122334455")).await?;

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "shop@example.com");
        assert!(sent[0].html.contains("sin TACC"));
        Ok(())
    }

    #[tokio::test]
    async fn test_delivery_failure_is_reported() {
        let mailer = RecordingMailer::failing();
        let result = send_contact_message(&mailer, &config(), message("Ana", "1122334455")).await;
        assert!(matches!(result, Err(Error::ExternalService { .. })));
    }

    #[tokio::test]
    async fn test_invalid_message_is_not_sent() {
        let mailer = RecordingMailer::default();
        let result = send_contact_message(&mailer, &config(), message("A", "1")).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(mailer.sent().is_empty());
    }
}
