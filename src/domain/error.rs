use thiserror::Error;

/// Core domain errors
///
/// Transport-agnostic: the API layer owns the mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Embedding provider unavailable: {message}")]
    EmbeddingUnavailable { message: String },

    #[error("Generator unavailable: {provider} - {message}")]
    GeneratorUnavailable { provider: String, message: String },

    #[error("Circuit breaker open - generator unavailable (retry in {retry_after_secs}s)")]
    CircuitOpen { retry_after_secs: u64 },

    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },

    #[error("Server is draining - not accepting new requests")]
    DrainInProgress,

    #[error("Missing API key")]
    AuthMissing,

    #[error("Invalid API key")]
    AuthInvalid,

    #[error("Admin access required")]
    AuthForbidden,

    #[error("Rate limit exceeded (resets at {reset_at})")]
    RateLimited {
        limit: u32,
        reset_at: u64,
        retry_after_secs: u64,
    },

    #[error("Validation error: {message}")]
    ValidationFailed { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable {
            message: message.into(),
        }
    }

    pub fn generator(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GeneratorUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn circuit_open(retry_after_secs: u64) -> Self {
        Self::CircuitOpen { retry_after_secs }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable kind string used in error response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmbeddingUnavailable { .. } => "embedding_unavailable",
            Self::GeneratorUnavailable { .. } => "generator_unavailable",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::StorageUnavailable { .. } => "storage_unavailable",
            Self::DrainInProgress => "drain_in_progress",
            Self::AuthMissing => "auth_missing",
            Self::AuthInvalid => "auth_invalid",
            Self::AuthForbidden => "auth_forbidden",
            Self::RateLimited { .. } => "rate_limited",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::Internal { .. } => "internal_error",
        }
    }
}
