//! Generator infrastructure: HTTP seam, Groq provider, circuit breaker

pub mod circuit_breaker;
pub mod groq;
pub mod http_client;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use groq::{GroqConfig, GroqProvider};
pub use http_client::{HttpCallError, HttpClient, HttpClientTrait};
