//! Domain error to HTTP response mapping
//!
//! The only place domain errors become status codes. 4xx bodies carry
//! `{error, message}`; 5xx bodies add `retry` and an optional `retry_after`
//! hint.

use axum::{
    Json,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable kind string
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// API error with status code and response headers
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
    headers: Vec<(HeaderName, String)>,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: impl Into<String>, message: impl Into<String>) -> Self {
        let retry = if status.is_server_error() {
            Some(true)
        } else {
            None
        };

        Self {
            status,
            body: ErrorBody {
                error: kind.into(),
                message: message.into(),
                retry,
                retry_after: None,
            },
            headers: Vec::new(),
        }
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.body.retry_after = Some(secs);
        self.with_header(axum::http::header::RETRY_AFTER, secs.to_string())
    }

    pub fn with_header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();

        for (name, value) in self.headers {
            if let Ok(value) = HeaderValue::from_str(&value) {
                response.headers_mut().insert(name, value);
            }
        }

        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let kind = err.kind();
        let message = err.to_string();

        match err {
            DomainError::ValidationFailed { .. } => {
                Self::new(StatusCode::BAD_REQUEST, kind, message)
            }
            DomainError::AuthMissing | DomainError::AuthInvalid => {
                Self::new(StatusCode::UNAUTHORIZED, kind, message)
            }
            DomainError::AuthForbidden => Self::new(StatusCode::FORBIDDEN, kind, message),
            DomainError::RateLimited {
                limit,
                reset_at,
                retry_after_secs,
            } => Self::new(StatusCode::TOO_MANY_REQUESTS, kind, message)
                .with_header(
                    HeaderName::from_static("x-ratelimit-limit"),
                    limit.to_string(),
                )
                .with_header(HeaderName::from_static("x-ratelimit-remaining"), "0")
                .with_header(
                    HeaderName::from_static("x-ratelimit-reset"),
                    reset_at.to_string(),
                )
                .with_header(
                    axum::http::header::RETRY_AFTER,
                    retry_after_secs.to_string(),
                ),
            DomainError::EmbeddingUnavailable { .. } | DomainError::GeneratorUnavailable { .. } => {
                Self::new(StatusCode::BAD_GATEWAY, kind, message)
            }
            DomainError::CircuitOpen { retry_after_secs } => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, kind, message)
                    .with_retry_after(retry_after_secs)
            }
            DomainError::StorageUnavailable { .. } | DomainError::DrainInProgress => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, kind, message)
            }
            DomainError::Internal { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, kind, message)
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.body.error, self.body.message)
    }
}

impl std::error::Error for ApiError {}
