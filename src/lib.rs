//! Sentinel Gateway
//!
//! A semantic caching gateway in front of a text-generation provider:
//! - Exact and embedding-similarity response caching with TTL
//! - Distributed single-flight lock suppressing duplicate generations
//! - Token-bucket rate limiting per API key
//! - Circuit breaker around the upstream generator

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use api::state::{AppState, Lifecycle};
use domain::{EmbeddingProvider, GeneratorProvider, KvStore};
use infrastructure::api_key::{ApiKeyAuth, RateLimitConfig, TokenBucketRateLimiter};
use infrastructure::cache::{
    ResponseCache, ResponseCacheConfig, RedisKvStore, SingleFlightConfig, SingleFlightLock,
};
use infrastructure::embedding::{JinaConfig, JinaEmbeddingProvider};
use infrastructure::llm::{
    CircuitBreaker, CircuitBreakerConfig, GroqConfig, GroqProvider, HttpClient,
};
use infrastructure::observability::{PrometheusMetrics, QueryMetrics};
use infrastructure::services::QueryService;

/// Assembles the application state.
///
/// Startup order: KV adapter, embedding client, generator client,
/// orchestrator, then rate limiter and auth. Missing credentials for a
/// required provider fail startup here.
pub async fn create_app_state(
    config: &AppConfig,
    prometheus: Option<PrometheusMetrics>,
) -> anyhow::Result<AppState> {
    let redis_url = config
        .cache
        .redis_url
        .clone()
        .context("Redis URL required. Set REDIS_URL")?;
    let kv: Arc<dyn KvStore> = Arc::new(
        RedisKvStore::with_url(&redis_url)
            .await
            .context("Failed to connect to the KV store")?,
    );

    let embedding_key = config
        .embedding
        .api_key
        .clone()
        .context("Embedding credential required. Set JINA_API_KEY")?;
    let embedding_client =
        HttpClient::with_timeout(Duration::from_secs(config.embedding.timeout_seconds))?;
    let mut jina_config = JinaConfig::new(embedding_key)
        .with_model(config.embedding.model.clone(), config.embedding.dimensions);
    if let Some(base_url) = &config.embedding.base_url {
        jina_config = jina_config.with_base_url(base_url);
    }
    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::new(JinaEmbeddingProvider::new(embedding_client, jina_config));

    let generator_key = config
        .generator
        .api_key
        .clone()
        .context("Generator credential required. Set GROQ_API_KEY")?;
    let generator_client =
        HttpClient::with_timeout(Duration::from_secs(config.generator.timeout_seconds))?;
    let mut groq_config = GroqConfig::new(generator_key)
        .with_initial_backoff(Duration::from_millis(config.generator.initial_backoff_ms));
    groq_config.max_attempts = config.generator.max_attempts;
    if let Some(base_url) = &config.generator.base_url {
        groq_config = groq_config.with_base_url(base_url);
    }
    let generator: Arc<dyn GeneratorProvider> =
        Arc::new(GroqProvider::new(generator_client, groq_config));

    let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: config.breaker.failure_threshold,
        cooldown: Duration::from_secs(config.breaker.cooldown_seconds),
    }));

    let response_cache = Arc::new(ResponseCache::with_config(
        kv.clone(),
        ResponseCacheConfig {
            key_prefix: config.cache.key_prefix.clone(),
            ttl: Duration::from_secs(config.cache.ttl_seconds),
            scan_batch: config.cache.scan_batch,
        },
    ));

    let lock = Arc::new(SingleFlightLock::with_config(
        kv.clone(),
        SingleFlightConfig {
            key_prefix: "sentinel:lock:".to_string(),
            ttl: Duration::from_secs(config.lock.ttl_seconds),
        },
    ));

    let metrics = Arc::new(QueryMetrics::new());

    let query_service = Arc::new(QueryService::new(
        response_cache.clone(),
        embedder.clone(),
        generator,
        breaker,
        lock,
        metrics.clone(),
    ));

    let rate_limiter = Arc::new(TokenBucketRateLimiter::new(
        kv,
        RateLimitConfig {
            max_requests: config.rate_limit.requests,
            window: Duration::from_secs(config.rate_limit.window_seconds),
            key_prefix: "ratelimit:".to_string(),
        },
    ));

    let auth = Arc::new(ApiKeyAuth::new(
        config.auth.user_keys.clone(),
        config.auth.admin_key.clone(),
    ));

    Ok(AppState {
        query_service,
        response_cache,
        embedder,
        auth,
        rate_limiter,
        metrics,
        prometheus,
        lifecycle: Arc::new(Lifecycle::new()),
        debug_mode: config.debug_mode,
    })
}
