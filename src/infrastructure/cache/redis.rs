//! Redis implementation of the key-value store

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::DomainError;
use crate::domain::kv::KvStore;

/// Configuration for the Redis adapter
#[derive(Debug, Clone)]
pub struct RedisKvConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
}

impl RedisKvConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Redis key-value store
///
/// Connection pooling via ConnectionManager; SET NX EX for the atomic
/// set-if-absent primitive; cursor-based SCAN for key iteration.
#[derive(Clone)]
pub struct RedisKvStore {
    connection: ConnectionManager,
    config: RedisKvConfig,
}

impl fmt::Debug for RedisKvStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisKvStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisKvStore {
    /// Connects to Redis and verifies the connection.
    pub async fn connect(config: RedisKvConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::storage(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    pub async fn with_url(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::connect(RedisKvConfig::new(url)).await
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        let result: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get key '{}': {}", key, e)))?;

        Ok(result)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();
        let ttl_secs = ttl.as_secs().max(1);

        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to set key '{}': {}", key, e)))?;

        Ok(())
    }

    async fn set_nx_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();
        let ttl_secs = ttl.as_secs().max(1);

        // SET NX EX is a single atomic command; this is the lock primitive
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to set_nx key '{}': {}", key, e)))?;

        // Redis returns "OK" if set, nil if the key existed
        Ok(result.is_some())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, DomainError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();

        let deleted: i64 = conn
            .del(keys)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete keys: {}", e)))?;

        Ok(deleted as usize)
    }

    async fn scan(&self, pattern: &str, batch: usize) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();
        let mut cursor = 0u64;
        let mut all_keys = Vec::new();

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(batch)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    DomainError::storage(format!(
                        "Failed to scan keys with pattern '{}': {}",
                        pattern, e
                    ))
                })?;

            all_keys.extend(keys);
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(all_keys)
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, DomainError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection.clone();
        let mut pipe = redis::pipe();

        for key in keys {
            pipe.get(key);
        }

        let values: Vec<Option<String>> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::storage(format!("Failed pipelined get: {}", e)))?;

        Ok(values)
    }

    async fn set_many_ex(
        &self,
        entries: &[(String, String)],
        ttl: Duration,
    ) -> Result<(), DomainError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection.clone();
        let ttl_secs = ttl.as_secs().max(1);
        let mut pipe = redis::pipe();

        for (key, value) in entries {
            pipe.set_ex(key, value, ttl_secs).ignore();
        }

        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| DomainError::storage(format!("Failed pipelined set: {}", e)))?;

        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let mut conn = self.connection.clone();

        let ttl_secs: i64 = conn
            .ttl(key)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get TTL for '{}': {}", key, e)))?;

        // Redis returns -2 if the key doesn't exist, -1 if it has no TTL
        if ttl_secs < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_secs(ttl_secs as u64)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests require a running Redis instance.

    async fn test_store() -> RedisKvStore {
        RedisKvStore::with_url("redis://127.0.0.1:6379").await.unwrap()
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_set_and_get() {
        let store = test_store().await;

        store
            .set_ex("kv_test:key1", "value1", Duration::from_secs(60))
            .await
            .unwrap();

        let result = store.get("kv_test:key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));

        store.delete(&["kv_test:key1".to_string()]).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_set_nx_second_write_loses() {
        let store = test_store().await;

        assert!(
            store
                .set_nx_ex("kv_test:nx", "a", Duration::from_secs(60))
                .await
                .unwrap()
        );
        assert!(
            !store
                .set_nx_ex("kv_test:nx", "b", Duration::from_secs(60))
                .await
                .unwrap()
        );

        store.delete(&["kv_test:nx".to_string()]).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_scan_and_pipeline() {
        let store = test_store().await;

        store
            .set_ex("kv_test:scan:a", "1", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .set_ex("kv_test:scan:b", "2", Duration::from_secs(60))
            .await
            .unwrap();

        let mut keys = store.scan("kv_test:scan:*", 100).await.unwrap();
        keys.sort();
        assert_eq!(keys.len(), 2);

        let values = store.get_many(&keys).await.unwrap();
        assert_eq!(values.len(), 2);

        store.delete(&keys).await.unwrap();
    }
}
