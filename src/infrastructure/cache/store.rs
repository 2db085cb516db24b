//! Exact-response cache store
//!
//! Maps prompts to generated responses with TTL, storing the prompt's
//! embedding under a sibling key so the semantic scan can reuse it.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::{CachedEntry, DomainError, KvStore};

const EMBEDDING_SUFFIX: &str = ":embedding";

/// Configuration for the response cache
#[derive(Debug, Clone)]
pub struct ResponseCacheConfig {
    /// Key prefix for namespacing
    pub key_prefix: String,
    /// TTL applied to entries and their embedding siblings
    pub ttl: Duration,
    /// SCAN page size
    pub scan_batch: usize,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: "sentinel:cache:".to_string(),
            ttl: Duration::from_secs(3600),
            scan_batch: 100,
        }
    }
}

/// Prompt-keyed response cache over the KV store
#[derive(Debug, Clone)]
pub struct ResponseCache {
    store: Arc<dyn KvStore>,
    config: ResponseCacheConfig,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_config(store, ResponseCacheConfig::default())
    }

    pub fn with_config(store: Arc<dyn KvStore>, config: ResponseCacheConfig) -> Self {
        Self { store, config }
    }

    fn response_key(&self, prompt: &str) -> String {
        format!("{}{}", self.config.key_prefix, prompt)
    }

    fn embedding_key(&self, prompt: &str) -> String {
        format!("{}{}{}", self.config.key_prefix, prompt, EMBEDDING_SUFFIX)
    }

    /// Exact probe by prompt. Identity equality only.
    pub async fn get(&self, prompt: &str) -> Result<Option<String>, DomainError> {
        self.store.get(&self.response_key(prompt)).await
    }

    /// Stores a response, refreshing any prior entry.
    ///
    /// The embedding sibling (when present) is written in the same pipeline
    /// and shares the entry's TTL. An absent embedding only degrades future
    /// semantic matches against this entry; exact matches are unaffected.
    pub async fn put(
        &self,
        prompt: &str,
        response: &str,
        embedding: Option<&[f32]>,
    ) -> Result<(), DomainError> {
        let mut entries = vec![(self.response_key(prompt), response.to_string())];

        if let Some(vector) = embedding {
            let encoded = serde_json::to_string(vector)
                .map_err(|e| DomainError::storage(format!("Failed to encode embedding: {}", e)))?;
            entries.push((self.embedding_key(prompt), encoded));
        }

        self.store.set_many_ex(&entries, self.config.ttl).await
    }

    /// Collects the live cache set for the semantic scan.
    ///
    /// O(N) over stored entries. Embedding siblings that expired, were never
    /// stored, or fail to decode yield `embedding: None` rather than an
    /// error; responses that vanish between scan and fetch are skipped.
    pub async fn entries(&self) -> Result<Vec<CachedEntry>, DomainError> {
        let pattern = format!("{}*", self.config.key_prefix);
        let keys = self.store.scan(&pattern, self.config.scan_batch).await?;

        let response_keys: Vec<String> = keys
            .into_iter()
            .filter(|k| !k.ends_with(EMBEDDING_SUFFIX))
            .collect();

        if response_keys.is_empty() {
            return Ok(Vec::new());
        }

        let embedding_keys: Vec<String> = response_keys
            .iter()
            .map(|k| format!("{}{}", k, EMBEDDING_SUFFIX))
            .collect();

        let responses = self.store.get_many(&response_keys).await?;
        let embeddings = self.store.get_many(&embedding_keys).await?;

        let mut entries = Vec::with_capacity(response_keys.len());

        for ((key, response), embedding_json) in
            response_keys.iter().zip(responses).zip(embeddings)
        {
            let Some(response) = response else {
                continue;
            };

            let prompt = key[self.config.key_prefix.len()..].to_string();
            let embedding = embedding_json.and_then(|json| {
                serde_json::from_str::<Vec<f32>>(&json)
                    .map_err(|e| {
                        warn!(prompt_prefix = %truncate(&prompt, 50), error = %e,
                            "Discarding undecodable cached embedding");
                    })
                    .ok()
            });

            entries.push(CachedEntry {
                prompt,
                response,
                embedding,
            });
        }

        Ok(entries)
    }

    /// Number of stored keys under the cache prefix (embedding siblings
    /// included).
    pub async fn count(&self) -> Result<usize, DomainError> {
        let pattern = format!("{}*", self.config.key_prefix);
        Ok(self.store.scan(&pattern, self.config.scan_batch).await?.len())
    }

    /// Deletes every key under the cache prefix, returning how many.
    pub async fn clear(&self) -> Result<usize, DomainError> {
        let pattern = format!("{}*", self.config.key_prefix);
        let keys = self.store.scan(&pattern, self.config.scan_batch).await?;

        if keys.is_empty() {
            return Ok(0);
        }

        self.store.delete(&keys).await
    }

    /// Remaining TTL of an entry (tests and diagnostics).
    pub async fn entry_ttl(&self, prompt: &str) -> Result<Option<Duration>, DomainError> {
        self.store.ttl(&self.response_key(prompt)).await
    }

    /// Remaining TTL of an entry's embedding sibling.
    pub async fn embedding_ttl(&self, prompt: &str) -> Result<Option<Duration>, DomainError> {
        self.store.ttl(&self.embedding_key(prompt)).await
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
