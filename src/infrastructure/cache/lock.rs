//! Distributed single-flight lock
//!
//! One lock per `(prompt, model)` pair, held by the request that will call
//! the generator. Everything rests on the KV store's atomic set-if-absent:
//! at most one lock record exists per key at any instant.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::domain::{DomainError, KvStore};

const LOCK_VALUE: &str = "held";

/// Configuration for the single-flight lock
#[derive(Debug, Clone)]
pub struct SingleFlightConfig {
    /// Key prefix for lock records
    pub key_prefix: String,
    /// Lock TTL; bounds how long a crashed winner can block losers
    pub ttl: Duration,
}

impl Default for SingleFlightConfig {
    fn default() -> Self {
        Self {
            key_prefix: "sentinel:lock:".to_string(),
            ttl: Duration::from_secs(30),
        }
    }
}

/// Per-`(prompt, model)` distributed lock with TTL
#[derive(Debug, Clone)]
pub struct SingleFlightLock {
    store: Arc<dyn KvStore>,
    config: SingleFlightConfig,
}

impl SingleFlightLock {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_config(store, SingleFlightConfig::default())
    }

    pub fn with_config(store: Arc<dyn KvStore>, config: SingleFlightConfig) -> Self {
        Self { store, config }
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Lock key: prefix + SHA-256 over `prompt NUL model`.
    ///
    /// The NUL separator keeps distinct pairs distinct; the digest keeps the
    /// key fixed-size regardless of prompt length. Collision resistance is
    /// the property the lock's correctness rests on, so the digest must stay
    /// cryptographic.
    pub fn lock_key(&self, prompt: &str, model: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        hasher.update([0u8]);
        hasher.update(model.as_bytes());
        format!("{}{}", self.config.key_prefix, hex::encode(hasher.finalize()))
    }

    /// Attempts to acquire the lock.
    ///
    /// Returns `true` when this request won and must call the generator.
    /// Fails open: if the store is unreachable the request proceeds as the
    /// winner - an extra generation beats refusing to serve.
    pub async fn acquire(&self, prompt: &str, model: &str) -> bool {
        let key = self.lock_key(prompt, model);

        match self
            .store
            .set_nx_ex(&key, LOCK_VALUE, self.config.ttl)
            .await
        {
            Ok(acquired) => acquired,
            Err(e) => {
                warn!(error = %e, "Lock acquire failed, proceeding without single-flight");
                true
            }
        }
    }

    /// Releases the lock on every winner exit path.
    ///
    /// A failed delete is non-fatal: the TTL still bounds the hold time.
    pub async fn release(&self, prompt: &str, model: &str) {
        let key = self.lock_key(prompt, model);

        if let Err(e) = self.store.delete(&[key]).await {
            warn!(error = %e, "Lock release failed, TTL will expire it");
        }
    }
}
