//! Query orchestration - the exact → semantic → lock → generate pipeline

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::domain::generation::GenerationRequest;
use crate::domain::{DomainError, EmbeddingProvider, Generation, GeneratorProvider, best_match};
use crate::infrastructure::cache::{ResponseCache, SingleFlightLock};
use crate::infrastructure::llm::CircuitBreaker;
use crate::infrastructure::observability::{CacheEvent, QueryMetrics};

/// One query, as handed to the orchestrator
#[derive(Debug, Clone)]
pub struct QueryParams {
    pub prompt: String,
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub similarity_threshold: f32,
}

/// Resolved query with cache/usage metadata
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub response: String,
    pub cache_hit: bool,
    pub similarity_score: Option<f32>,
    pub matched_prompt: Option<String>,
    pub provider: String,
    pub model: String,
    pub tokens_used: u32,
    pub latency_ms: f64,
}

/// Tuning for the loser-side cache poll
#[derive(Debug, Clone)]
pub struct QueryServiceConfig {
    /// First poll interval; doubles per round
    pub poll_initial: Duration,
    /// Poll interval cap
    pub poll_max: Duration,
}

impl Default for QueryServiceConfig {
    fn default() -> Self {
        Self {
            poll_initial: Duration::from_millis(100),
            poll_max: Duration::from_secs(2),
        }
    }
}

/// Orchestrates one request across cache, embedder, lock, and generator.
///
/// Recovers locally from exactly two faults: an unavailable embedder (the
/// semantic step is skipped) and a failed lock acquire (proceeds as winner).
/// Everything else propagates typed to the transport layer.
#[derive(Debug, Clone)]
pub struct QueryService {
    cache: Arc<ResponseCache>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GeneratorProvider>,
    breaker: Arc<CircuitBreaker>,
    lock: Arc<SingleFlightLock>,
    metrics: Arc<QueryMetrics>,
    config: QueryServiceConfig,
}

impl QueryService {
    pub fn new(
        cache: Arc<ResponseCache>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GeneratorProvider>,
        breaker: Arc<CircuitBreaker>,
        lock: Arc<SingleFlightLock>,
        metrics: Arc<QueryMetrics>,
    ) -> Self {
        Self {
            cache,
            embedder,
            generator,
            breaker,
            lock,
            metrics,
            config: QueryServiceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: QueryServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Executes the full pipeline for one request.
    pub async fn execute(&self, params: QueryParams) -> Result<QueryOutcome, DomainError> {
        let start = Instant::now();
        let prefix = prompt_prefix(&params.prompt);

        // Best-effort embedding: without it, exact matching and generation
        // still work
        let query_embedding = match self.embedder.embed(&params.prompt).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(prompt_prefix = %prefix, error = %e,
                    "Embedding unavailable, exact cache only");
                None
            }
        };

        // Exact probe first: O(1) against the O(N) semantic scan
        if let Some(response) = self.cache.get(&params.prompt).await? {
            self.metrics.record_cache_event(CacheEvent::Exact);
            let latency_ms = elapsed_ms(start);
            info!(prompt_prefix = %prefix, similarity = 1.0, latency_ms, "Cache hit (exact)");

            return Ok(self.hit_outcome(&params, response, 1.0, params.prompt.clone(), latency_ms));
        }

        if let Some(query) = &query_embedding {
            let entries = self.cache.entries().await?;
            if let Some(found) = best_match(query, &entries, params.similarity_threshold) {
                self.metrics.record_cache_event(CacheEvent::Semantic);
                let latency_ms = elapsed_ms(start);
                info!(prompt_prefix = %prefix, similarity = found.similarity, latency_ms,
                    "Cache hit (semantic)");

                return Ok(self.hit_outcome(
                    &params,
                    found.response,
                    found.similarity,
                    found.prompt,
                    latency_ms,
                ));
            }
        }

        self.metrics.record_cache_event(CacheEvent::Miss);
        info!(prompt_prefix = %prefix, "Cache miss");

        if self.lock.acquire(&params.prompt, &params.model).await {
            self.metrics.inc_active_locks();
            let result = self
                .generate_and_store(&params, query_embedding.as_deref())
                .await;
            self.metrics.dec_active_locks();
            // Release on every exit path; a leaked lock stalls losers until
            // the TTL expires
            self.lock.release(&params.prompt, &params.model).await;

            let generation = result?;
            Ok(self.generated_outcome(&params, generation, elapsed_ms(start)))
        } else {
            self.wait_for_winner(&params, query_embedding.as_deref(), start)
                .await
        }
    }

    /// Winner path: breaker-guarded generation plus cache write-back.
    async fn generate_and_store(
        &self,
        params: &QueryParams,
        embedding: Option<&[f32]>,
    ) -> Result<Generation, DomainError> {
        let request = GenerationRequest::new(&params.prompt, &params.model)
            .with_temperature(params.temperature)
            .with_max_tokens(params.max_tokens);

        let generation = self.breaker.call(self.generator.generate(request)).await?;

        self.metrics.record_generation_cost(
            &generation.provider,
            &generation.model,
            generation.cost_usd,
        );

        self.cache
            .put(&params.prompt, &generation.response, embedding)
            .await?;

        info!(
            prompt_prefix = %prompt_prefix(&params.prompt),
            tokens = generation.tokens_used,
            cost_usd = generation.cost_usd,
            "Generated and cached"
        );

        Ok(generation)
    }

    /// Loser path: poll the exact cache until the winner publishes, with
    /// exponential backoff capped at `poll_max`, for at most the lock TTL.
    async fn wait_for_winner(
        &self,
        params: &QueryParams,
        embedding: Option<&[f32]>,
        start: Instant,
    ) -> Result<QueryOutcome, DomainError> {
        let prefix = prompt_prefix(&params.prompt);
        let ceiling = self.lock.ttl();
        let mut interval = self.config.poll_initial;
        let mut waited = Duration::ZERO;

        info!(prompt_prefix = %prefix, "Lock held elsewhere, polling cache");

        while waited < ceiling {
            tokio::time::sleep(interval).await;
            waited += interval;

            if let Some(response) = self.cache.get(&params.prompt).await? {
                let latency_ms = elapsed_ms(start);
                info!(prompt_prefix = %prefix, waited_ms = waited.as_millis() as u64, latency_ms,
                    "Cache populated by lock holder");

                return Ok(self.hit_outcome(
                    params,
                    response,
                    1.0,
                    params.prompt.clone(),
                    latency_ms,
                ));
            }

            interval = (interval * 2).min(self.config.poll_max);
        }

        // The winner crashed or is stuck; its lock has expired with the
        // ceiling, so generate here
        warn!(prompt_prefix = %prefix, waited_secs = ceiling.as_secs(),
            "Poll ceiling reached, generating directly");

        let generation = self.generate_and_store(params, embedding).await?;
        Ok(self.generated_outcome(params, generation, elapsed_ms(start)))
    }

    fn hit_outcome(
        &self,
        params: &QueryParams,
        response: String,
        similarity: f32,
        matched_prompt: String,
        latency_ms: f64,
    ) -> QueryOutcome {
        QueryOutcome {
            response,
            cache_hit: true,
            similarity_score: Some(similarity),
            matched_prompt: Some(matched_prompt),
            provider: params.provider.clone(),
            model: params.model.clone(),
            tokens_used: 0,
            latency_ms,
        }
    }

    fn generated_outcome(
        &self,
        params: &QueryParams,
        generation: Generation,
        latency_ms: f64,
    ) -> QueryOutcome {
        QueryOutcome {
            response: generation.response,
            cache_hit: false,
            similarity_score: None,
            matched_prompt: None,
            provider: params.provider.clone(),
            model: params.model.clone(),
            tokens_used: generation.tokens_used,
            latency_ms,
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn prompt_prefix(prompt: &str) -> String {
    prompt.chars().take(50).collect()
}
