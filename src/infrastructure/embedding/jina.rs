//! Jina embedding provider

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::DomainError;
use crate::domain::embedding::EmbeddingProvider;
use crate::infrastructure::llm::HttpClientTrait;

const DEFAULT_JINA_BASE_URL: &str = "https://api.jina.ai";

/// Configuration for the Jina provider
#[derive(Debug, Clone)]
pub struct JinaConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
}

impl JinaConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_JINA_BASE_URL.to_string(),
            model: "jina-embeddings-v3".to_string(),
            dimensions: 1024,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }
}

/// Jina embeddings API client
///
/// Single attempt per call; the timeout lives in the HTTP client. Retrying
/// (or not) is the orchestrator's decision, and it chooses to degrade to
/// exact-only matching instead.
#[derive(Debug)]
pub struct JinaEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    config: JinaConfig,
}

impl<C: HttpClientTrait> JinaEmbeddingProvider<C> {
    pub fn new(client: C, config: JinaConfig) -> Self {
        let auth_header = format!("Bearer {}", config.api_key);
        Self {
            client,
            auth_header,
            config,
        }
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.config.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn validate(&self, vector: Vec<f32>) -> Result<Vec<f32>, DomainError> {
        if vector.len() != self.config.dimensions {
            return Err(DomainError::embedding(format!(
                "Expected {} dimensions, got {}",
                self.config.dimensions,
                vector.len()
            )));
        }

        if vector.iter().any(|v| !v.is_finite()) {
            return Err(DomainError::embedding("Embedding has non-finite components"));
        }

        // A zero vector means "embedding unavailable": cosine is undefined
        if vector.iter().all(|v| *v == 0.0) {
            return Err(DomainError::embedding("Embedding has zero magnitude"));
        }

        Ok(vector)
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for JinaEmbeddingProvider<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "input": [text],
        });

        let json = self
            .client
            .post_json(&self.embeddings_url(), self.headers(), &body)
            .await
            .map_err(|e| DomainError::embedding(e.to_string()))?;

        let response: JinaEmbeddingResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::embedding(format!("Failed to parse embedding response: {}", e))
        })?;

        let vector = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| DomainError::embedding("Embedding response has no data"))?;

        self.validate(vector)
    }

    fn provider_name(&self) -> &'static str {
        "jina"
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }
}

#[derive(Debug, Deserialize)]
struct JinaEmbeddingResponse {
    data: Vec<JinaEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct JinaEmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.jina.ai/v1/embeddings";

    fn response_with(vector: Vec<f32>) -> serde_json::Value {
        serde_json::json!({
            "model": "jina-embeddings-v3",
            "data": [{"index": 0, "embedding": vector, "object": "embedding"}],
            "usage": {"total_tokens": 6}
        })
    }

    fn provider(client: MockHttpClient, dimensions: usize) -> JinaEmbeddingProvider<MockHttpClient> {
        JinaEmbeddingProvider::new(
            client,
            JinaConfig::new("test-key").with_model("jina-embeddings-v3", dimensions),
        )
    }

    #[tokio::test]
    async fn test_embed_returns_vector() {
        let client = MockHttpClient::new().with_response(TEST_URL, response_with(vec![0.1, 0.2, 0.3]));
        let provider = provider(client, 3);

        let vector = provider.embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_transport_failure_is_embedding_unavailable() {
        let client = MockHttpClient::new().with_timeout(TEST_URL);
        let provider = provider(client, 3);

        let err = provider.embed("hello").await.unwrap_err();
        assert!(matches!(err, DomainError::EmbeddingUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_single_attempt_no_retry() {
        let client = MockHttpClient::new()
            .with_status(TEST_URL, 500, "oops")
            .with_response(TEST_URL, response_with(vec![0.1, 0.2, 0.3]));
        let provider = provider(client, 3);

        assert!(provider.embed("hello").await.is_err());
        assert_eq!(provider.client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected() {
        let client = MockHttpClient::new().with_response(TEST_URL, response_with(vec![0.1, 0.2]));
        let provider = provider(client, 3);

        let err = provider.embed("hello").await.unwrap_err();
        assert!(err.to_string().contains("dimensions"));
    }

    #[tokio::test]
    async fn test_zero_vector_rejected() {
        let client =
            MockHttpClient::new().with_response(TEST_URL, response_with(vec![0.0, 0.0, 0.0]));
        let provider = provider(client, 3);

        let err = provider.embed("hello").await.unwrap_err();
        assert!(err.to_string().contains("zero magnitude"));
    }

    #[tokio::test]
    async fn test_empty_data_rejected() {
        let client = MockHttpClient::new().with_response(
            TEST_URL,
            serde_json::json!({"model": "jina-embeddings-v3", "data": []}),
        );
        let provider = provider(client, 3);

        let err = provider.embed("hello").await.unwrap_err();
        assert!(err.to_string().contains("no data"));
    }
}
