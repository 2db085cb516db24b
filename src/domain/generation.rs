//! Generator provider trait definition

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Parameters for one generation call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Completed generation with usage and cost accounting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub response: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub tokens_used: u32,
    pub cost_usd: f64,
    pub latency_ms: f64,
    pub provider: String,
    pub model: String,
}

/// Trait for text-generation providers (Groq, OpenAI, etc.)
///
/// Implementations own their retry policy; callers never retry on top.
#[async_trait]
pub trait GeneratorProvider: Send + Sync + Debug {
    /// Execute one generation, retrying transient transport faults internally.
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
