//! HTTP client seam for provider calls
//!
//! Providers depend on this trait so their retry classification and parsing
//! can be tested without a network.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Transport-level outcome of a provider HTTP call, classified for retry
/// decisions.
#[derive(Debug, Error)]
pub enum HttpCallError {
    #[error("connect error: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl HttpCallError {
    /// Transient faults worth another attempt: connection failures,
    /// timeouts, upstream 5xx, and upstream rate limiting.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connect(_) | Self::Timeout(_) => true,
            Self::Status { code, .. } => *code >= 500 || *code == 429,
            Self::Malformed(_) => false,
        }
    }
}

/// Trait for HTTP POST operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, HttpCallError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn with_timeout(timeout: Duration) -> Result<Self, crate::domain::DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                crate::domain::DomainError::internal(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, HttpCallError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                HttpCallError::Timeout(e.to_string())
            } else {
                HttpCallError::Connect(e.to_string())
            }
        })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpCallError::Status {
                code: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| HttpCallError::Malformed(e.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(HttpCallError::Connect("x".into()).is_retryable());
        assert!(HttpCallError::Timeout("x".into()).is_retryable());
        assert!(
            HttpCallError::Status {
                code: 500,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            HttpCallError::Status {
                code: 429,
                body: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_non_retryable_classification() {
        assert!(
            !HttpCallError::Status {
                code: 401,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            !HttpCallError::Status {
                code: 400,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!HttpCallError::Malformed("bad json".into()).is_retryable());
    }
}
