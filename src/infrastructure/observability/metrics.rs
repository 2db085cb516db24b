//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Buckets tuned for mixed sub-ms cache hits and multi-second generator
/// calls
const DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Unit scale for `llm_cost_usd_total`: the counter accumulates
/// micro-dollars (1 USD = 1_000_000 units). Divide by this in dashboards.
pub const COST_MICRO_USD_SCALE: u64 = 1_000_000;

/// Prometheus metrics handle for serving the scrape endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize the Prometheus recorder
pub fn init_metrics() -> Option<PrometheusMetrics> {
    let builder = PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("request_duration_seconds".to_string()),
        DURATION_BUCKETS,
    );

    let builder = match builder {
        Ok(builder) => builder,
        Err(e) => {
            tracing::error!("Failed to configure metric buckets: {}", e);
            return None;
        }
    };

    match builder.install_recorder() {
        Ok(handle) => {
            gauge!("sentinel_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Cache decision recorded once per query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    Exact,
    Semantic,
    Miss,
}

impl CacheEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Semantic => "semantic",
            Self::Miss => "miss",
        }
    }
}

/// Point-in-time view of the cache counters
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheSnapshot {
    pub exact_hits: u64,
    pub semantic_hits: u64,
    pub misses: u64,
}

impl CacheSnapshot {
    pub fn hits(&self) -> u64 {
        self.exact_hits + self.semantic_hits
    }

    pub fn total(&self) -> u64 {
        self.hits() + self.misses
    }

    pub fn hit_rate_percent(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.hits() as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
    }
}

/// Recording facade shared by the middleware and the orchestrator
///
/// Doubles the cache-event counters into process-local atomics so the JSON
/// summary endpoint can read them back (the Prometheus recorder is
/// write-only from here).
#[derive(Debug, Default)]
pub struct QueryMetrics {
    exact_hits: AtomicU64,
    semantic_hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one HTTP request (RED: rate, errors, duration)
    pub fn record_request(&self, endpoint: &str, status: u16, duration: Duration) {
        let labels = [
            ("endpoint", endpoint.to_string()),
            ("status", status.to_string()),
        ];
        counter!("requests_total", &labels).increment(1);

        let duration_labels = [("endpoint", endpoint.to_string())];
        histogram!("request_duration_seconds", &duration_labels).record(duration.as_secs_f64());
    }

    /// Record the cache decision for one query
    pub fn record_cache_event(&self, event: CacheEvent) {
        let counter = match event {
            CacheEvent::Exact => &self.exact_hits,
            CacheEvent::Semantic => &self.semantic_hits,
            CacheEvent::Miss => &self.misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let labels = [("type", event.as_str().to_string())];
        counter!("cache_events_total", &labels).increment(1);
    }

    /// Accumulate generator spend, in micro-dollars ([`COST_MICRO_USD_SCALE`])
    pub fn record_generation_cost(&self, provider: &str, model: &str, cost_usd: f64) {
        let labels = [
            ("provider", provider.to_string()),
            ("model", model.to_string()),
        ];
        counter!("llm_cost_usd_total", &labels).increment(cost_to_micro_usd(cost_usd));
    }

    /// Winners currently executing a generator call
    pub fn inc_active_locks(&self) {
        gauge!("active_locks").increment(1.0);
    }

    pub fn dec_active_locks(&self) {
        gauge!("active_locks").decrement(1.0);
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            exact_hits: self.exact_hits.load(Ordering::Relaxed),
            semantic_hits: self.semantic_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

fn cost_to_micro_usd(cost_usd: f64) -> u64 {
    (cost_usd * COST_MICRO_USD_SCALE as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_event_labels_are_a_closed_set() {
        assert_eq!(CacheEvent::Exact.as_str(), "exact");
        assert_eq!(CacheEvent::Semantic.as_str(), "semantic");
        assert_eq!(CacheEvent::Miss.as_str(), "miss");
    }

    #[test]
    fn test_snapshot_counts_events() {
        let metrics = QueryMetrics::new();

        metrics.record_cache_event(CacheEvent::Exact);
        metrics.record_cache_event(CacheEvent::Exact);
        metrics.record_cache_event(CacheEvent::Semantic);
        metrics.record_cache_event(CacheEvent::Miss);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.exact_hits, 2);
        assert_eq!(snapshot.semantic_hits, 1);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.hits(), 3);
        assert_eq!(snapshot.total(), 4);
        assert_eq!(snapshot.hit_rate_percent(), 75.0);
    }

    #[test]
    fn test_empty_snapshot_hit_rate_is_zero() {
        assert_eq!(CacheSnapshot::default().hit_rate_percent(), 0.0);
    }

    #[test]
    fn test_cost_scaled_to_micro_dollars() {
        assert_eq!(cost_to_micro_usd(0.0), 0);
        assert_eq!(cost_to_micro_usd(0.000009), 9);
        assert_eq!(cost_to_micro_usd(1.5), 1_500_000);
    }

    #[test]
    fn test_sub_micro_cost_rounds_to_nearest_unit() {
        assert_eq!(cost_to_micro_usd(0.0000035), 4);
        assert_eq!(cost_to_micro_usd(0.0000004), 0);
    }
}
