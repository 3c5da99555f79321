//! Outbound notifications: the email relay client and the message templates.
//!
//! Email goes through an HTTP relay (Resend-compatible JSON API). The relay is a
//! collaborator that may fail independently of the shop, so callers decide whether a failed
//! send matters: order notifications are logged and dropped, contact messages are reported
//! back to the sender.

pub mod templates;

use crate::{
    config::EmailConfig,
    errors::{Error, Result},
};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A fully rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<()>;
}

/// Mailer used when no relay is configured; every send fails.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, email: Email) -> Result<()> {
        debug!("Dropping email '{}': relay disabled", email.subject);
        Err(Error::ExternalService {
            service: "email",
            message: "email relay is not configured".to_string(),
        })
    }
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Sends email through an HTTP relay.
pub struct HttpMailer {
    http: reqwest::Client,
    relay_url: String,
    token: Option<String>,
    from: String,
}

impl HttpMailer {
    #[must_use]
    pub fn new(http: reqwest::Client, relay_url: String, token: Option<String>, from: String) -> Self {
        Self {
            http,
            relay_url,
            token,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, email), fields(subject = %email.subject))]
    async fn send(&self, email: Email) -> Result<()> {
        let body = RelayRequest {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
        };

        let mut request = self.http.post(&self.relay_url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| Error::ExternalService {
            service: "email",
            message: format!("request failed: {e}"),
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::ExternalService {
                service: "email",
                message: format!("relay returned {status}: {detail}"),
            });
        }

        info!("Email delivered to {}", email.to);
        Ok(())
    }
}

/// Picks the mailer for `[email]`: the relay client when `relay_url` is set, otherwise
/// [`DisabledMailer`].
pub fn build_mailer(
    http: &reqwest::Client,
    config: &EmailConfig,
    token: Option<String>,
) -> Arc<dyn Mailer> {
    match &config.relay_url {
        Some(url) if !url.trim().is_empty() => Arc::new(HttpMailer::new(
            http.clone(),
            url.trim().to_string(),
            token,
            config.from.clone(),
        )),
        _ => Arc::new(DisabledMailer),
    }
}
