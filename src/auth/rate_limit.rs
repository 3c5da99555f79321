//! Token-bucket limiter for admin password attempts, keyed by client address.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: DateTime<Utc>,
}

/// Every password attempt costs one token; a client with an empty bucket is refused before
/// any hash comparison runs.
pub struct AttemptLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    capacity: f64,
    refill_per_sec: f64,
}

impl AttemptLimiter {
    #[must_use]
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity: capacity.max(1.0),
            refill_per_sec: refill_per_sec.max(0.0),
        }
    }

    /// Takes one token for `client`, returning `false` if none is available.
    pub async fn allow(&self, client: &str) -> bool {
        self.allow_at(client, Utc::now()).await
    }

    fn refilled(&self, bucket: &Bucket, now: DateTime<Utc>) -> f64 {
        let elapsed = (now - bucket.last_refill)
            .to_std()
            .map_or(0.0, |d| d.as_secs_f64());
        elapsed
            .mul_add(self.refill_per_sec, bucket.tokens)
            .min(self.capacity)
    }

    async fn allow_at(&self, client: &str, now: DateTime<Utc>) -> bool {
        let mut lock = self.buckets.lock().await;
        // A bucket that has refilled completely behaves exactly like a fresh one
        lock.retain(|_, bucket| self.refilled(bucket, now) < self.capacity);

        let bucket = lock.entry(client.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });
        bucket.tokens = self.refilled(bucket, now);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.buckets.lock().await.len()
    }
}
