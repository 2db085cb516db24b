use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::state::AppState;
use super::{admin, health, middleware as mw, v1};

/// Create the full router with application state
pub fn create_router(state: AppState) -> Router {
    let mut router: Router<AppState> = Router::new()
        // Public endpoints
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/metrics", get(prometheus_metrics))
        // Authenticated API
        .route("/v1/query", post(v1::query::query))
        .route("/v1/metrics", get(v1::metrics::metrics_summary));

    // Admin surface only exists in debug mode
    if state.debug_mode {
        router = router
            .route("/v1/cache/all", get(admin::list_cache))
            .route("/v1/cache/clear", delete(admin::clear_cache))
            .route("/v1/cache/test-embeddings", post(admin::test_embeddings));
    }

    router
        // Innermost first: auth runs after the drain gate
        .layer(middleware::from_fn_with_state(
            state.clone(),
            mw::require_api_key,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            mw::track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /metrics - Prometheus exposition text
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.prometheus {
        Some(prometheus) => (StatusCode::OK, prometheus.render()).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed",
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::api::state::Lifecycle;
    use crate::domain::{EmbeddingProvider, KvStore};
    use crate::domain::embedding::mock::MockEmbeddingProvider;
    use crate::domain::generation::mock::MockGeneratorProvider;
    use crate::domain::kv::mock::MockKvStore;
    use crate::infrastructure::api_key::{ApiKeyAuth, RateLimitConfig, TokenBucketRateLimiter};
    use crate::infrastructure::cache::{ResponseCache, SingleFlightLock};
    use crate::infrastructure::llm::CircuitBreaker;
    use crate::infrastructure::observability::QueryMetrics;
    use crate::infrastructure::services::QueryService;

    const USER_KEY: &str = "sk-user-test-0001";
    const ADMIN_KEY: &str = "sk-admin-test-0001";

    fn test_state(rate_limit: u32, debug_mode: bool) -> AppState {
        let kv: Arc<dyn KvStore> = Arc::new(MockKvStore::new());
        let response_cache = Arc::new(ResponseCache::new(kv.clone()));
        let metrics = Arc::new(QueryMetrics::new());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new(4));

        let query_service = Arc::new(QueryService::new(
            response_cache.clone(),
            embedder.clone(),
            Arc::new(MockGeneratorProvider::new("generated answer")),
            Arc::new(CircuitBreaker::default()),
            Arc::new(SingleFlightLock::new(kv.clone())),
            metrics.clone(),
        ));

        let rate_limiter = Arc::new(TokenBucketRateLimiter::new(
            kv,
            RateLimitConfig {
                max_requests: rate_limit,
                window: Duration::from_secs(60),
                key_prefix: "ratelimit:".to_string(),
            },
        ));

        AppState {
            query_service,
            response_cache,
            embedder,
            auth: Arc::new(ApiKeyAuth::new(
                vec![USER_KEY.to_string()],
                Some(ADMIN_KEY.to_string()),
            )),
            rate_limiter,
            metrics,
            prometheus: None,
            lifecycle: Arc::new(Lifecycle::new()),
            debug_mode,
        }
    }

    fn request(method: &str, path: &str, api_key: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(path);

        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }

        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const QUERY_BODY: &str = r#"{"prompt": "What is quantum computing?"}"#;

    #[tokio::test]
    async fn test_health_is_public() {
        let router = create_router(test_state(100, false));

        let response = router
            .oneshot(request("GET", "/health", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_query_without_key_is_401() {
        let router = create_router(test_state(100, false));

        let response = router
            .oneshot(request("POST", "/v1/query", None, Some(QUERY_BODY)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"], "auth_missing");
    }

    #[tokio::test]
    async fn test_query_with_unknown_key_is_401() {
        let router = create_router(test_state(100, false));

        let response = router
            .oneshot(request("POST", "/v1/query", Some("sk-bogus"), Some(QUERY_BODY)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"], "auth_invalid");
    }

    #[tokio::test]
    async fn test_query_miss_then_exact_hit() {
        let router = create_router(test_state(100, false));

        let first = router
            .clone()
            .oneshot(request("POST", "/v1/query", Some(USER_KEY), Some(QUERY_BODY)))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert!(first.headers().contains_key("x-ratelimit-remaining"));

        let json = body_json(first).await;
        assert_eq!(json["cache_hit"], false);
        assert_eq!(json["tokens_used"], 30);
        assert_eq!(json["provider"], "groq");

        let second = router
            .oneshot(request("POST", "/v1/query", Some(USER_KEY), Some(QUERY_BODY)))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);

        let json = body_json(second).await;
        assert_eq!(json["cache_hit"], true);
        assert_eq!(json["similarity_score"], 1.0);
        assert_eq!(json["tokens_used"], 0);
        assert_eq!(json["matched_prompt"], "What is quantum computing?");
    }

    #[tokio::test]
    async fn test_invalid_body_is_400() {
        let router = create_router(test_state(100, false));

        let response = router
            .oneshot(request(
                "POST",
                "/v1/query",
                Some(USER_KEY),
                Some(r#"{"prompt": "p", "temperature": 9.0}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "validation_failed");
    }

    #[tokio::test]
    async fn test_rate_limit_burst_returns_429_with_headers() {
        let router = create_router(test_state(3, false));

        for _ in 0..3 {
            let response = router
                .clone()
                .oneshot(request("GET", "/v1/metrics", Some(USER_KEY), None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = router
            .oneshot(request("GET", "/v1/metrics", Some(USER_KEY), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("x-ratelimit-remaining").unwrap(), "0");
        assert!(response.headers().contains_key("retry-after"));

        let json = body_json(response).await;
        assert_eq!(json["error"], "rate_limited");
    }

    #[tokio::test]
    async fn test_metrics_summary_counts_queries() {
        let router = create_router(test_state(100, false));

        router
            .clone()
            .oneshot(request("POST", "/v1/query", Some(USER_KEY), Some(QUERY_BODY)))
            .await
            .unwrap();
        router
            .clone()
            .oneshot(request("POST", "/v1/query", Some(USER_KEY), Some(QUERY_BODY)))
            .await
            .unwrap();

        let response = router
            .oneshot(request("GET", "/v1/metrics", Some(USER_KEY), None))
            .await
            .unwrap();
        let json = body_json(response).await;

        assert_eq!(json["total_requests"], 2);
        assert_eq!(json["cache_hits"], 1);
        assert_eq!(json["cache_misses"], 1);
        assert_eq!(json["hit_rate_percent"], 50.0);
        // Response entry plus its embedding sibling
        assert_eq!(json["stored_items"], 2);
    }

    #[tokio::test]
    async fn test_admin_routes_absent_without_debug_mode() {
        let router = create_router(test_state(100, false));

        let response = router
            .oneshot(request("GET", "/v1/cache/all", Some(ADMIN_KEY), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_route_forbidden_for_user_key() {
        let router = create_router(test_state(100, true));

        let response = router
            .oneshot(request("GET", "/v1/cache/all", Some(USER_KEY), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["error"], "auth_forbidden");
    }

    #[tokio::test]
    async fn test_admin_clear_then_query_misses() {
        let router = create_router(test_state(100, true));

        router
            .clone()
            .oneshot(request("POST", "/v1/query", Some(USER_KEY), Some(QUERY_BODY)))
            .await
            .unwrap();

        let cleared = router
            .clone()
            .oneshot(request("DELETE", "/v1/cache/clear", Some(ADMIN_KEY), None))
            .await
            .unwrap();
        assert_eq!(cleared.status(), StatusCode::OK);

        let json = body_json(cleared).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["deleted_keys"], 2);

        let after = router
            .oneshot(request("POST", "/v1/query", Some(USER_KEY), Some(QUERY_BODY)))
            .await
            .unwrap();
        let json = body_json(after).await;
        assert_eq!(json["cache_hit"], false);
        assert!(json["tokens_used"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_admin_test_embeddings_reports_similarity() {
        let router = create_router(test_state(100, true));

        router
            .clone()
            .oneshot(request("POST", "/v1/query", Some(USER_KEY), Some(QUERY_BODY)))
            .await
            .unwrap();

        let response = router
            .oneshot(request(
                "POST",
                "/v1/cache/test-embeddings",
                Some(ADMIN_KEY),
                Some(QUERY_BODY),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["cached_items"], 1);
        let score = &json["similarity_scores"][0];
        assert_eq!(score["above_threshold"], true);
    }

    #[tokio::test]
    async fn test_draining_rejects_new_requests() {
        let state = test_state(100, false);
        state.lifecycle.begin_drain();
        let router = create_router(state);

        let response = router
            .oneshot(request("GET", "/health", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"], "drain_in_progress");
    }
}
