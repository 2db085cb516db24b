//! Request tracking middleware: drain gate, in-flight counting, RED metrics

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::api::state::{AppState, InFlightGuard};
use crate::api::types::ApiError;
use crate::domain::DomainError;

/// Outermost request middleware.
///
/// Once draining starts, new requests are refused before touching any
/// service; in-flight requests keep their guard until the response (or a
/// client disconnect) drops it.
pub async fn track_requests(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if state.lifecycle.is_draining() {
        warn!(method = %request.method(), path = %request.uri().path(),
            "Rejecting request during drain");
        return ApiError::from(DomainError::DrainInProgress).into_response();
    }

    let _guard = InFlightGuard::enter(&state.lifecycle);

    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    info!("→ {} {}", method, path);

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status().as_u16();

    info!("← {} | {:.1}ms", status, duration.as_secs_f64() * 1000.0);
    state.metrics.record_request(&path, status, duration);

    response
}
