//! Groq generation provider

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::http_client::{HttpCallError, HttpClientTrait};
use crate::domain::generation::{Generation, GenerationRequest, GeneratorProvider};
use crate::domain::DomainError;

const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com";

/// Per-1K-token rates used for deterministic cost accounting
const INPUT_COST_PER_1K_TOKENS: f64 = 0.00005;
const OUTPUT_COST_PER_1K_TOKENS: f64 = 0.00015;

/// Configuration for the Groq provider
#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub api_key: String,
    pub base_url: String,
    /// Total attempts, counting the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per retry
    pub initial_backoff: Duration,
}

impl GroqConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }
}

/// Groq chat-completions provider
///
/// Retries transient transport faults with exponential backoff; no caller
/// retries on top of this.
#[derive(Debug)]
pub struct GroqProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    config: GroqConfig,
}

impl<C: HttpClientTrait> GroqProvider<C> {
    pub fn new(client: C, config: GroqConfig) -> Self {
        let auth_header = format!("Bearer {}", config.api_key);
        Self {
            client,
            auth_header,
            config,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/openai/v1/chat/completions", self.config.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn build_request(&self, request: &GenerationRequest) -> serde_json::Value {
        serde_json::json!({
            "model": request.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }

    fn parse_response(
        &self,
        json: serde_json::Value,
        model: &str,
        latency_ms: f64,
    ) -> Result<Generation, DomainError> {
        let response: GroqChatResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::generator("groq", format!("Failed to parse response: {}", e))
        })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DomainError::generator("groq", "Invalid response: missing choices"))?;

        let usage = response.usage.unwrap_or_default();
        let cost_usd = calculate_cost(usage.prompt_tokens, usage.completion_tokens);

        Ok(Generation {
            response: content,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            tokens_used: usage.total_tokens,
            cost_usd,
            latency_ms,
            provider: "groq".to_string(),
            model: model.to_string(),
        })
    }
}

fn calculate_cost(input_tokens: u32, output_tokens: u32) -> f64 {
    (input_tokens as f64 / 1000.0) * INPUT_COST_PER_1K_TOKENS
        + (output_tokens as f64 / 1000.0) * OUTPUT_COST_PER_1K_TOKENS
}

#[async_trait]
impl<C: HttpClientTrait> GeneratorProvider for GroqProvider<C> {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, DomainError> {
        let url = self.completions_url();
        let body = self.build_request(&request);
        let start = Instant::now();
        let mut backoff = self.config.initial_backoff;

        for attempt in 1..=self.config.max_attempts {
            match self.client.post_json(&url, self.headers(), &body).await {
                Ok(json) => {
                    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
                    let generation = self.parse_response(json, &request.model, latency_ms)?;

                    info!(
                        model = %generation.model,
                        tokens = generation.tokens_used,
                        cost_usd = generation.cost_usd,
                        "Groq call completed"
                    );

                    return Ok(generation);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        delay_ms = backoff.as_millis() as u64,
                        "Retryable Groq error, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e @ HttpCallError::Status { code: 401 | 403, .. }) => {
                    return Err(DomainError::generator(
                        "groq",
                        format!("authentication failed: {}", e),
                    ));
                }
                Err(e) => {
                    return Err(DomainError::generator(
                        "groq",
                        format!("failed after {} attempt(s): {}", attempt, e),
                    ));
                }
            }
        }

        Err(DomainError::generator("groq", "retry attempts exhausted"))
    }

    fn provider_name(&self) -> &'static str {
        "groq"
    }
}

// Groq API response types (OpenAI-compatible)

#[derive(Debug, Deserialize)]
struct GroqChatResponse {
    choices: Vec<GroqChoice>,
    usage: Option<GroqUsage>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqMessage,
}

#[derive(Debug, Deserialize)]
struct GroqMessage {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct GroqUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}
