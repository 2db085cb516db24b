//! Public health endpoints

use axum::response::IntoResponse;
use chrono::Utc;

use crate::api::types::{HealthResponse, Json};

/// GET / - connectivity check
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Sentinel gateway is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /health - load balancer health check
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
