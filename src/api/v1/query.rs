//! Query endpoint handler

use axum::{Extension, extract::State};
use tracing::info;
use validator::Validate;

use crate::api::state::{AppState, AuthContext};
use crate::api::types::{ApiError, Json, QueryRequest, QueryResponse};
use crate::domain::DomainError;
use crate::infrastructure::services::QueryParams;

/// POST /v1/query
pub async fn query(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::from(DomainError::validation(e.to_string())))?;

    info!(
        key_prefix = %auth.key_prefix,
        role = %auth.role,
        model = %request.model,
        "Processing query"
    );

    let outcome = state
        .query_service
        .execute(QueryParams {
            prompt: request.prompt,
            provider: request.provider,
            model: request.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            similarity_threshold: request.similarity_threshold,
        })
        .await
        .map_err(ApiError::from)?;

    Ok(Json(QueryResponse {
        response: outcome.response,
        cache_hit: outcome.cache_hit,
        similarity_score: outcome.similarity_score,
        matched_prompt: outcome.matched_prompt,
        provider: outcome.provider,
        model: outcome.model,
        tokens_used: outcome.tokens_used,
        latency_ms: outcome.latency_ms,
    }))
}
