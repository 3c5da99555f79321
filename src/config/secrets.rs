//! Secrets are read from the environment only, never from config.toml.
//!
//! `.env` is loaded by `main` before this runs, so local development can keep them there.

use tracing::warn;

/// Credentials for the admin gate and the external collaborators.
#[derive(Clone, Default)]
pub struct Secrets {
    /// bcrypt hash of the shared admin password (`ADMIN_PASSWORD_HASH`)
    pub admin_password_hash: Option<String>,
    /// Payment gateway access token (`MERCADO_PAGO_ACCESS_TOKEN`)
    pub payment_access_token: Option<String>,
    /// Bearer token for the email relay (`EMAIL_RELAY_TOKEN`)
    pub email_relay_token: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("admin_password_hash", &self.admin_password_hash.is_some())
            .field("payment_access_token", &self.payment_access_token.is_some())
            .field("email_relay_token", &self.email_relay_token.is_some())
            .finish()
    }
}

impl Secrets {
    /// Reads all secrets from the process environment. Blank values count as unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            admin_password_hash: read("ADMIN_PASSWORD_HASH"),
            payment_access_token: read("MERCADO_PAGO_ACCESS_TOKEN"),
            email_relay_token: read("EMAIL_RELAY_TOKEN"),
        }
    }

    /// Logs a startup warning for every secret that is not configured.
    pub fn warn_missing(&self) {
        if self.admin_password_hash.is_none() {
            warn!("ADMIN_PASSWORD_HASH is not set: every admin request will be refused");
        }
        if self.payment_access_token.is_none() {
            warn!("MERCADO_PAGO_ACCESS_TOKEN is not set: hosted checkout is unavailable");
        }
        if self.email_relay_token.is_none() {
            warn!("EMAIL_RELAY_TOKEN is not set: email notifications may be rejected by the relay");
        }
    }
}
