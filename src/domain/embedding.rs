//! Embedding provider trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

/// Trait for embedding providers (Jina, OpenAI, etc.)
///
/// A single text in, a fixed-dimension vector out. Failures are typed as
/// [`DomainError::EmbeddingUnavailable`]; the orchestrator treats them as
/// non-fatal and skips semantic matching.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Embed a single text into a fixed-dimension vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Embedding dimension produced by this provider.
    fn dimensions(&self) -> usize;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug)]
    pub struct MockEmbeddingProvider {
        dimensions: usize,
        fixed: Mutex<HashMap<String, Vec<f32>>>,
        error: Option<String>,
    }

    impl MockEmbeddingProvider {
        pub fn new(dimensions: usize) -> Self {
            Self {
                dimensions,
                fixed: Mutex::new(HashMap::new()),
                error: None,
            }
        }

        /// Pins the vector returned for a specific text.
        pub fn with_vector(self, text: &str, vector: Vec<f32>) -> Self {
            self.fixed
                .lock()
                .unwrap()
                .insert(text.to_string(), vector);
            self
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
            if let Some(ref error) = self.error {
                return Err(DomainError::embedding(error));
            }

            if let Some(vector) = self.fixed.lock().unwrap().get(text) {
                return Ok(vector.clone());
            }

            // Deterministic vector derived from the text bytes
            let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_add(b as u64));
            let vector: Vec<f32> = (0..self.dimensions)
                .map(|i| ((hash.wrapping_add(i as u64) % 1000) as f32 / 1000.0) + 0.001)
                .collect();

            Ok(vector)
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_deterministic_embeddings() {
            let provider = MockEmbeddingProvider::new(8);

            let a = provider.embed("Hello").await.unwrap();
            let b = provider.embed("Hello").await.unwrap();

            assert_eq!(a, b);
            assert_eq!(a.len(), 8);
        }

        #[tokio::test]
        async fn test_pinned_vector() {
            let provider = MockEmbeddingProvider::new(3).with_vector("hi", vec![1.0, 0.0, 0.0]);

            assert_eq!(provider.embed("hi").await.unwrap(), vec![1.0, 0.0, 0.0]);
        }

        #[tokio::test]
        async fn test_error_mode() {
            let provider = MockEmbeddingProvider::new(8).with_error("API error");

            let result = provider.embed("Hello").await;
            assert!(matches!(
                result,
                Err(DomainError::EmbeddingUnavailable { .. })
            ));
        }
    }
}
