//! JSON metrics summary endpoint

use axum::extract::State;
use tracing::warn;

use crate::api::state::AppState;
use crate::api::types::{Json, MetricsSummaryResponse};

/// GET /v1/metrics
///
/// Quick-look JSON counters; the Prometheus endpoint is the real
/// monitoring surface.
pub async fn metrics_summary(State(state): State<AppState>) -> Json<MetricsSummaryResponse> {
    let snapshot = state.metrics.snapshot();

    let stored_items = match state.response_cache.count().await {
        Ok(count) => count,
        Err(e) => {
            warn!(error = %e, "Failed to count cached items for metrics summary");
            0
        }
    };

    Json(MetricsSummaryResponse {
        total_requests: snapshot.total(),
        cache_hits: snapshot.hits(),
        cache_misses: snapshot.misses,
        hit_rate_percent: snapshot.hit_rate_percent(),
        stored_items,
        uptime_seconds: state.lifecycle.uptime_seconds(),
    })
}
