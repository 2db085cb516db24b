//! Token-bucket rate limiter backed by the KV store
//!
//! Distributed: multiple gateway instances sharing one store enforce one
//! budget per API key. The read-compute-write sequence is not atomic, so a
//! heavily contended key can briefly overshoot its budget by the number of
//! concurrent checkers.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::domain::KvStore;

/// Configuration for the rate limiter
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Bucket capacity: max requests per window
    pub max_requests: u32,
    /// Window length; refill rate is `max_requests / window`
    pub window: Duration,
    /// Key prefix for counter state
    pub key_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            key_prefix: "ratelimit:".to_string(),
        }
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp when the bucket is full again (or when one token
    /// becomes available, if denied)
    pub reset_at: u64,
    /// Seconds until the next token, for Retry-After on denials
    pub retry_after_secs: u64,
}

/// Token bucket per API key, state in the KV store
#[derive(Debug)]
pub struct TokenBucketRateLimiter {
    store: Arc<dyn KvStore>,
    config: RateLimitConfig,
    refill_rate: f64,
}

impl TokenBucketRateLimiter {
    pub fn new(store: Arc<dyn KvStore>, config: RateLimitConfig) -> Self {
        let refill_rate = config.max_requests as f64 / config.window.as_secs_f64();
        Self {
            store,
            config,
            refill_rate,
        }
    }

    pub fn limit(&self) -> u32 {
        self.config.max_requests
    }

    fn count_key(&self, api_key: &str) -> String {
        format!("{}{}:count", self.config.key_prefix, api_key)
    }

    fn reset_key(&self, api_key: &str) -> String {
        format!("{}{}:reset", self.config.key_prefix, api_key)
    }

    /// Checks and (when allowed) consumes one token.
    ///
    /// Fails open: a storage error admits the request rather than refusing
    /// to serve.
    pub async fn check(&self, api_key: &str) -> RateDecision {
        match self.check_inner(api_key).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "Rate limiter storage error, failing open");
                self.fail_open()
            }
        }
    }

    async fn check_inner(
        &self,
        api_key: &str,
    ) -> Result<RateDecision, crate::domain::DomainError> {
        let capacity = self.config.max_requests as f64;
        let now = unix_now();

        let keys = [self.count_key(api_key), self.reset_key(api_key)];
        let values = self.store.get_many(&keys).await?;

        // Lazily initialize: a never-seen key starts with a full bucket
        let stored_tokens = values[0]
            .as_deref()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(capacity);
        let last_refill = values[1]
            .as_deref()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(now);

        let elapsed = (now - last_refill).max(0.0);
        let tokens = (stored_tokens + elapsed * self.refill_rate).min(capacity);

        if tokens >= 1.0 {
            let new_tokens = tokens - 1.0;

            let entries = [
                (keys[0].clone(), format!("{}", new_tokens)),
                (keys[1].clone(), format!("{}", now)),
            ];
            self.store
                .set_many_ex(&entries, self.config.window * 2)
                .await?;

            Ok(RateDecision {
                allowed: true,
                limit: self.config.max_requests,
                remaining: new_tokens.floor() as u32,
                reset_at: (now + (capacity - new_tokens) / self.refill_rate) as u64,
                retry_after_secs: 0,
            })
        } else {
            let wait = (1.0 - tokens) / self.refill_rate;

            Ok(RateDecision {
                allowed: false,
                limit: self.config.max_requests,
                remaining: 0,
                reset_at: (now + wait) as u64,
                retry_after_secs: wait.ceil().max(1.0) as u64,
            })
        }
    }

    fn fail_open(&self) -> RateDecision {
        RateDecision {
            allowed: true,
            limit: self.config.max_requests,
            remaining: self.config.max_requests,
            reset_at: unix_now() as u64,
            retry_after_secs: 0,
        }
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::kv::mock::MockKvStore;

    fn limiter(store: MockKvStore, max_requests: u32, window_secs: u64) -> TokenBucketRateLimiter {
        TokenBucketRateLimiter::new(
            Arc::new(store),
            RateLimitConfig {
                max_requests,
                window: Duration::from_secs(window_secs),
                key_prefix: "ratelimit:".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_first_request_initializes_full_bucket() {
        let limiter = limiter(MockKvStore::new(), 10, 60);

        let decision = limiter.check("key-a").await;

        assert!(decision.allowed);
        assert_eq!(decision.limit, 10);
        assert_eq!(decision.remaining, 9);
        assert!(decision.reset_at > 0);
    }

    #[tokio::test]
    async fn test_burst_admits_exactly_capacity() {
        let limiter = limiter(MockKvStore::new(), 3, 60);

        for expected_remaining in [2u32, 1, 0] {
            let decision = limiter.check("key-a").await;
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let denied = limiter.check("key-a").await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.retry_after_secs >= 1);
        assert!(denied.reset_at >= unix_now() as u64);
    }

    #[tokio::test]
    async fn test_keys_have_independent_buckets() {
        let limiter = limiter(MockKvStore::new(), 1, 60);

        assert!(limiter.check("key-a").await.allowed);
        assert!(!limiter.check("key-a").await.allowed);
        assert!(limiter.check("key-b").await.allowed);
    }

    #[tokio::test]
    async fn test_elapsed_time_refills_tokens() {
        let past = unix_now() - 60.0;
        let store = MockKvStore::new()
            .with_entry("ratelimit:key-a:count", "0", None)
            .with_entry("ratelimit:key-a:reset", &format!("{}", past), None);
        let limiter = limiter(store, 3, 60);

        // A full window elapsed: the empty bucket refilled to capacity
        let decision = limiter.check("key-a").await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
    }

    #[tokio::test]
    async fn test_refill_is_capped_at_capacity() {
        let long_ago = unix_now() - 86_400.0;
        let store = MockKvStore::new()
            .with_entry("ratelimit:key-a:count", "2", None)
            .with_entry("ratelimit:key-a:reset", &format!("{}", long_ago), None);
        let limiter = limiter(store, 5, 60);

        let decision = limiter.check("key-a").await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);
    }

    #[tokio::test]
    async fn test_state_expires_after_two_windows() {
        let store = MockKvStore::new();
        let limiter = limiter(store, 5, 60);

        limiter.check("key-a").await;

        let ttl = limiter
            .store
            .ttl("ratelimit:key-a:count")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ttl, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_storage_error_fails_open() {
        let limiter = limiter(MockKvStore::new().with_error("down"), 1, 60);

        assert!(limiter.check("key-a").await.allowed);
        assert!(limiter.check("key-a").await.allowed);
    }

    #[tokio::test]
    async fn test_denied_request_writes_nothing() {
        let store = MockKvStore::new()
            .with_entry("ratelimit:key-a:count", "0.2", None)
            .with_entry("ratelimit:key-a:reset", &format!("{}", unix_now()), None);
        let limiter = limiter(store, 100, 60);

        let denied = limiter.check("key-a").await;
        assert!(!denied.allowed);

        // Stored token count unchanged by the denial
        let stored = limiter
            .store
            .get("ratelimit:key-a:count")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, "0.2");
    }
}
