//! Admin authentication - the password gate in front of every admin operation.
//!
//! There is a single shared admin password, stored only as a bcrypt hash
//! (`ADMIN_PASSWORD_HASH`). Callers authenticate in one of two ways:
//! - sending the password itself in the `Authorization` header, or
//! - exchanging it once for a session token and sending `Authorization: Bearer <token>`.
//!
//! Every password comparison is throttled per client by [`AttemptLimiter`] and runs on the
//! blocking thread pool. When no hash is configured the gate refuses everything.

pub mod rate_limit;
pub mod session;

pub use rate_limit::AttemptLimiter;
pub use session::{Session, SessionStore};

use crate::{
    config::AuthConfig,
    errors::{Error, Result},
};
use tracing::{debug, warn};

/// Work factor used when hashing a new admin password.
pub const HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// The credential carried by an `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    Password(&'a str),
    Session(&'a str),
}

impl<'a> Credential<'a> {
    /// Parses a header value. Empty values carry no credential.
    #[must_use]
    pub fn parse(header: &'a str) -> Option<Self> {
        if header.is_empty() {
            return None;
        }
        match header.strip_prefix("Bearer ") {
            Some(token) => {
                let token = token.trim();
                (!token.is_empty()).then_some(Self::Session(token))
            }
            None => Some(Self::Password(header)),
        }
    }
}

/// Compares a supplied secret against the configured bcrypt hash.
pub struct PasswordGate {
    hash: Option<String>,
}

impl PasswordGate {
    #[must_use]
    pub const fn new(hash: Option<String>) -> Self {
        Self { hash }
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.hash.is_some()
    }

    /// Admits `secret` iff it matches the configured hash.
    ///
    /// # Errors
    /// - [`Error::AuthenticationMissing`] if no secret or an empty one was supplied
    /// - [`Error::AuthenticationDenied`] if it does not match
    /// - [`Error::AuthenticationSystem`] if no hash is configured or bcrypt itself failed
    pub async fn verify(&self, secret: Option<&str>) -> Result<()> {
        let secret = secret
            .filter(|s| !s.is_empty())
            .ok_or(Error::AuthenticationMissing)?;
        let hash = self.hash.clone().ok_or_else(|| Error::AuthenticationSystem {
            message: "admin password is not configured".to_string(),
        })?;

        let secret = secret.to_string();
        let matched = tokio::task::spawn_blocking(move || bcrypt::verify(secret, &hash))
            .await
            .map_err(|e| Error::AuthenticationSystem {
                message: format!("verification task failed: {e}"),
            })?
            .map_err(|e| Error::AuthenticationSystem {
                message: e.to_string(),
            })?;

        if matched {
            Ok(())
        } else {
            Err(Error::AuthenticationDenied)
        }
    }
}

/// Hashes a password for use as `ADMIN_PASSWORD_HASH`.
pub fn hash_password(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(Error::validation("Password cannot be empty"));
    }
    bcrypt::hash(password, HASH_COST).map_err(|e| Error::AuthenticationSystem {
        message: e.to_string(),
    })
}

/// Gate, session store and attempt limiter combined, as used by the HTTP layer.
pub struct AdminAuth {
    gate: PasswordGate,
    sessions: SessionStore,
    limiter: AttemptLimiter,
}

impl AdminAuth {
    #[must_use]
    pub fn new(password_hash: Option<String>, config: &AuthConfig) -> Self {
        Self {
            gate: PasswordGate::new(password_hash),
            sessions: SessionStore::new(config.session_ttl_hours),
            limiter: AttemptLimiter::new(config.attempt_capacity, config.attempt_refill_per_sec),
        }
    }

    /// Authorizes an admin request from `client` carrying the given `Authorization` header.
    pub async fn authorize(&self, client: &str, header: Option<&str>) -> Result<()> {
        match header.and_then(Credential::parse) {
            None => Err(Error::AuthenticationMissing),
            Some(Credential::Session(token)) => {
                if self.sessions.validate(token).await {
                    Ok(())
                } else {
                    debug!("Rejected unknown or expired session token");
                    Err(Error::AuthenticationDenied)
                }
            }
            Some(Credential::Password(password)) => self.check_password(client, password).await,
        }
    }

    /// Checks a password and, if it matches, opens a session.
    pub async fn login(&self, client: &str, password: Option<&str>) -> Result<Session> {
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or(Error::AuthenticationMissing)?;
        self.check_password(client, password).await?;
        Ok(self.sessions.issue().await)
    }

    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token).await
    }

    async fn check_password(&self, client: &str, password: &str) -> Result<()> {
        if !self.limiter.allow(client).await {
            warn!("Too many admin password attempts from {}", client);
            return Err(Error::TooManyAttempts);
        }
        let result = self.gate.verify(Some(password)).await;
        if let Err(Error::AuthenticationDenied) = &result {
            warn!("Admin password rejected for {}", client);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    const PASSWORD: &str = "s3creto";

    fn gate() -> PasswordGate {
        PasswordGate::new(Some(bcrypt::hash(PASSWORD, 4).unwrap()))
    }

    fn auth_with_capacity(capacity: f64) -> AdminAuth {
        let config = AuthConfig {
            attempt_capacity: capacity,
            attempt_refill_per_sec: 0.0,
            ..AuthConfig::default()
        };
        AdminAuth::new(Some(bcrypt::hash(PASSWORD, 4).unwrap()), &config)
    }

    #[tokio::test]
    async fn test_gate_admits_only_the_exact_password() {
        let gate = gate();
        assert!(gate.verify(Some(PASSWORD)).await.is_ok());

        for wrong in ["s3cretO", "s3creto ", "s3cret", "x"] {
            assert!(matches!(
                gate.verify(Some(wrong)).await,
                Err(Error::AuthenticationDenied)
            ));
        }
    }

    #[tokio::test]
    async fn test_gate_distinguishes_missing_credential() {
        let gate = gate();
        assert!(matches!(gate.verify(None).await, Err(Error::AuthenticationMissing)));
        assert!(matches!(gate.verify(Some("")).await, Err(Error::AuthenticationMissing)));
    }

    #[tokio::test]
    async fn test_unconfigured_gate_fails_closed() {
        let gate = PasswordGate::new(None);
        assert!(!gate.is_configured());
        assert!(matches!(
            gate.verify(Some("superadmin")).await,
            Err(Error::AuthenticationSystem { .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_hash_is_system_error() {
        let gate = PasswordGate::new(Some("not-a-bcrypt-hash".to_string()));
        assert!(matches!(
            gate.verify(Some(PASSWORD)).await,
            Err(Error::AuthenticationSystem { .. })
        ));
    }

    #[test]
    fn test_credential_parsing() {
        assert_eq!(Credential::parse(""), None);
        assert_eq!(Credential::parse("Bearer "), None);
        assert_eq!(Credential::parse("Bearer abc"), Some(Credential::Session("abc")));
        assert_eq!(Credential::parse("hunter2"), Some(Credential::Password("hunter2")));
    }

    #[tokio::test]
    async fn test_login_then_authorize_with_session() -> Result<()> {
        let auth = auth_with_capacity(10.0);
        let session = auth.login("local", Some(PASSWORD)).await?;

        let header = format!("Bearer {}", session.token);
        auth.authorize("local", Some(&header)).await?;

        assert!(auth.logout(&session.token).await);
        assert!(matches!(
            auth.authorize("local", Some(&header)).await,
            Err(Error::AuthenticationDenied)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_attempts_are_throttled_per_client() {
        let auth = auth_with_capacity(2.0);
        assert!(auth.authorize("1.2.3.4", Some("wrong")).await.is_err());
        assert!(auth.authorize("1.2.3.4", Some("wrong")).await.is_err());

        // Even the right password is refused once the bucket is empty
        assert!(matches!(
            auth.authorize("1.2.3.4", Some(PASSWORD)).await,
            Err(Error::TooManyAttempts)
        ));
        assert!(auth.authorize("5.6.7.8", Some(PASSWORD)).await.is_ok());
    }

    #[test]
    fn test_hash_password_rejects_empty() {
        assert!(hash_password("").is_err());
    }
}
