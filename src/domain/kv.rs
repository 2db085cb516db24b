//! Key-value store trait definition
//!
//! All shared mutable state (cache entries, locks, rate-limit counters) lives
//! behind this trait. Components never hold raw client handles.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::DomainError;

/// Typed access to the external key-value store.
///
/// Raw UTF-8 string values keep the trait dyn-compatible; callers own their
/// encoding. Every failure surfaces as
/// [`DomainError::StorageUnavailable`].
#[async_trait]
pub trait KvStore: Send + Sync + Debug {
    /// Gets a raw value.
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw value with a TTL.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Atomically sets a value with a TTL only if the key is absent.
    ///
    /// Returns whether the write occurred. This is the lock primitive: at
    /// most one caller observes `true` per key per TTL window.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration)
    -> Result<bool, DomainError>;

    /// Deletes keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<usize, DomainError>;

    /// Collects all keys matching a glob pattern.
    ///
    /// Cursor-based underneath; must tolerate deletes interleaved with the
    /// iteration. `batch` bounds the per-roundtrip page size.
    async fn scan(&self, pattern: &str, batch: usize) -> Result<Vec<String>, DomainError>;

    /// Pipelined multi-get preserving input order.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, DomainError>;

    /// Pipelined multi-set, all entries sharing one TTL.
    async fn set_many_ex(
        &self,
        entries: &[(String, String)],
        ttl: Duration,
    ) -> Result<(), DomainError>;

    /// Remaining TTL for a key, `None` if absent or unexpiring.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError>;
}
