//! API key auth and per-key rate limiting

pub mod auth;
pub mod rate_limiter;

pub use auth::{ApiKeyAuth, Role, key_prefix};
pub use rate_limiter::{RateDecision, RateLimitConfig, TokenBucketRateLimiter};
