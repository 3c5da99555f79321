//! In-memory admin sessions.
//!
//! After a successful password check the admin panel receives a random token and sends it as
//! `Authorization: Bearer <token>` instead of the password. Tokens expire after a fixed TTL and
//! do not survive a restart.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// A freshly issued session, returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, DateTime<Utc>>>,
    ttl: TimeDelta,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: TimeDelta::try_hours(ttl_hours.max(1)).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Issues a new token. Expired sessions are purged on the way.
    pub async fn issue(&self) -> Session {
        let now = Utc::now();
        let token = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, expiry| *expiry > now);
        sessions.insert(token.clone(), expires_at);
        debug!("Issued admin session, {} active", sessions.len());

        Session { token, expires_at }
    }

    /// Returns whether `token` names a live session. Expired tokens are dropped.
    pub async fn validate(&self, token: &str) -> bool {
        self.validate_at(token, Utc::now()).await
    }

    async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(token) {
            Some(expiry) if *expiry > now => true,
            Some(_) => {
                sessions.remove(token);
                false
            }
            None => false,
        }
    }

    /// Revokes a token. Returns `false` if it was not active.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.lock().await.remove(token).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_validate_revoke() {
        let store = SessionStore::new(24);
        let session = store.issue().await;
        assert_eq!(session.token.len(), 64);
        assert!(store.validate(&session.token).await);
        assert!(!store.validate("not-a-token").await);

        assert!(store.revoke(&session.token).await);
        assert!(!store.validate(&session.token).await);
        assert!(!store.revoke(&session.token).await);
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let store = SessionStore::new(1);
        let session = store.issue().await;
        let later = session.expires_at + TimeDelta::seconds(1);
        assert!(!store.validate_at(&session.token, later).await);
        // It was purged, so it stays invalid even at an earlier time
        assert!(!store.validate(&session.token).await);
    }
}
