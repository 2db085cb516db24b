//! API key authentication + rate limiting middleware

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::api::state::{AppState, AuthContext};
use crate::api::types::ApiError;
use crate::domain::DomainError;
use crate::infrastructure::api_key::{RateDecision, key_prefix};

/// Routes served without a credential
const PUBLIC_PATHS: &[&str] = &["/", "/health", "/metrics"];

/// Validates `X-API-Key`, enforces the per-key token bucket, and stamps the
/// request with its [`AuthContext`]. Rate-limit headers ride on every
/// authenticated response.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let Some(api_key) = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
    else {
        warn!(path = %request.uri().path(), "Missing API key");
        return ApiError::from(DomainError::AuthMissing).into_response();
    };

    let role = match state.auth.validate(&api_key) {
        Ok(role) => role,
        Err(e) => {
            warn!(key_prefix = %key_prefix(&api_key), "Invalid API key");
            return ApiError::from(e).into_response();
        }
    };

    let decision = state.rate_limiter.check(&api_key).await;

    if !decision.allowed {
        warn!(key_prefix = %key_prefix(&api_key), "Rate limited");
        return ApiError::from(DomainError::RateLimited {
            limit: decision.limit,
            reset_at: decision.reset_at,
            retry_after_secs: decision.retry_after_secs,
        })
        .into_response();
    }

    debug!(key_prefix = %key_prefix(&api_key), role = %role, "Authenticated");

    request.extensions_mut().insert(AuthContext {
        key_prefix: key_prefix(&api_key),
        role,
    });

    let mut response = next.run(request).await;
    append_rate_limit_headers(&mut response, &decision);
    response
}

fn append_rate_limit_headers(response: &mut Response, decision: &RateDecision) {
    let headers = response.headers_mut();

    let pairs = [
        ("x-ratelimit-limit", decision.limit.to_string()),
        ("x-ratelimit-remaining", decision.remaining.to_string()),
        ("x-ratelimit-reset", decision.reset_at.to_string()),
    ];

    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}
