//! Request/response schemas for the query surface

use serde::{Deserialize, Serialize};
use validator::Validate;

fn default_provider() -> String {
    "groq".to_string()
}

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

fn default_similarity_threshold() -> f32 {
    0.75
}

/// POST /v1/query request body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,

    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 1, max = 4000))]
    pub max_tokens: u32,

    #[serde(default = "default_similarity_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub similarity_threshold: f32,
}

/// POST /v1/query response body
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub response: String,
    pub cache_hit: bool,
    pub similarity_score: Option<f32>,
    pub matched_prompt: Option<String>,
    pub provider: String,
    pub model: String,
    pub tokens_used: u32,
    pub latency_ms: f64,
}

/// GET /health response body
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /v1/metrics response body
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummaryResponse {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate_percent: f64,
    pub stored_items: usize,
    pub uptime_seconds: u64,
}
