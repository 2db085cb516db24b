//! Application state shared across handlers

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use crate::domain::EmbeddingProvider;
use crate::infrastructure::api_key::{ApiKeyAuth, Role, TokenBucketRateLimiter};
use crate::infrastructure::cache::ResponseCache;
use crate::infrastructure::observability::{PrometheusMetrics, QueryMetrics};
use crate::infrastructure::services::QueryService;

/// Drain flag plus in-flight accounting for graceful shutdown
#[derive(Debug)]
pub struct Lifecycle {
    draining: AtomicBool,
    in_flight: AtomicUsize,
    started_at: Instant,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            draining: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn begin_drain(&self) {
        self.draining.store(true, Ordering::SeqCst);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter on drop, so cancelled requests are
/// counted out too.
#[derive(Debug)]
pub struct InFlightGuard {
    lifecycle: Arc<Lifecycle>,
}

impl InFlightGuard {
    /// Counts a request in until the guard drops.
    pub fn enter(lifecycle: &Arc<Lifecycle>) -> Self {
        lifecycle.in_flight.fetch_add(1, Ordering::SeqCst);
        Self {
            lifecycle: lifecycle.clone(),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.lifecycle.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Authenticated identity attached to the request by the auth middleware
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub key_prefix: String,
    pub role: Role,
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub query_service: Arc<QueryService>,
    pub response_cache: Arc<ResponseCache>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub auth: Arc<ApiKeyAuth>,
    pub rate_limiter: Arc<TokenBucketRateLimiter>,
    pub metrics: Arc<QueryMetrics>,
    pub prometheus: Option<PrometheusMetrics>,
    pub lifecycle: Arc<Lifecycle>,
    pub debug_mode: bool,
}
