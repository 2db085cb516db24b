//! Admin cache routes
//!
//! Mounted only when debug mode is on; every handler additionally requires
//! an admin key.

use axum::{Extension, extract::State};
use serde::Serialize;
use tracing::info;
use validator::Validate;

use crate::api::state::{AppState, AuthContext};
use crate::api::types::{ApiError, Json, QueryRequest};
use crate::domain::{DomainError, cosine_similarity};

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Serialize)]
pub struct CacheListing {
    pub cached_items: Vec<CacheListingItem>,
    pub total_cached: usize,
    pub embeddings_stored: usize,
}

#[derive(Debug, Serialize)]
pub struct CacheListingItem {
    pub prompt: String,
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResult {
    pub status: &'static str,
    pub deleted_keys: usize,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingTestReport {
    pub query_prompt: String,
    pub cached_items: usize,
    pub similarity_scores: Vec<SimilarityScore>,
}

#[derive(Debug, Serialize)]
pub struct SimilarityScore {
    pub cached_prompt: String,
    pub similarity: f32,
    pub above_threshold: bool,
}

fn require_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role.is_admin() {
        Ok(())
    } else {
        Err(ApiError::from(DomainError::AuthForbidden))
    }
}

/// GET /v1/cache/all
pub async fn list_cache(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<CacheListing>, ApiError> {
    require_admin(&auth)?;

    let entries = state.response_cache.entries().await.map_err(ApiError::from)?;
    let embeddings_stored = entries.iter().filter(|e| e.embedding.is_some()).count();

    let cached_items = entries
        .iter()
        .map(|e| CacheListingItem {
            prompt: truncate(&e.prompt),
            response: truncate(&e.response),
        })
        .collect();

    Ok(Json(CacheListing {
        total_cached: entries.len(),
        embeddings_stored,
        cached_items,
    }))
}

/// DELETE /v1/cache/clear
pub async fn clear_cache(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ClearCacheResult>, ApiError> {
    require_admin(&auth)?;

    let deleted_keys = state.response_cache.clear().await.map_err(ApiError::from)?;
    info!(deleted_keys, "Cache cleared");

    Ok(Json(ClearCacheResult {
        status: "success",
        deleted_keys,
    }))
}

/// POST /v1/cache/test-embeddings
///
/// Embeds the submitted prompt and reports its similarity against every
/// cached entry, for threshold tuning.
pub async fn test_embeddings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<EmbeddingTestReport>, ApiError> {
    require_admin(&auth)?;

    request
        .validate()
        .map_err(|e| ApiError::from(DomainError::validation(e.to_string())))?;

    let query_embedding = state
        .embedder
        .embed(&request.prompt)
        .await
        .map_err(ApiError::from)?;

    let entries = state.response_cache.entries().await.map_err(ApiError::from)?;

    let similarity_scores = entries
        .iter()
        .filter_map(|entry| {
            entry.embedding.as_ref().map(|embedding| {
                let similarity = cosine_similarity(&query_embedding, embedding);
                SimilarityScore {
                    cached_prompt: truncate(&entry.prompt),
                    similarity,
                    above_threshold: similarity >= request.similarity_threshold,
                }
            })
        })
        .collect();

    Ok(Json(EmbeddingTestReport {
        query_prompt: request.prompt,
        cached_items: entries.len(),
        similarity_scores,
    }))
}

fn truncate(s: &str) -> String {
    s.chars().take(PREVIEW_CHARS).collect()
}
