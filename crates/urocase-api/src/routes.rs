//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::{
    analyze_image, analyze_video, analyze_video_stream, chat, create_case, create_message,
    delete_case, get_case, health, list_cases, list_messages, probe_upload, ready,
    refine_explanation, stream_case_video, update_case,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, mask_internal_errors, rate_limit_middleware, request_id, request_logging,
    security_headers, RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Case CRUD is cheap; inference and ffmpeg routes run for minutes
    let case_routes = Router::new()
        .route("/cases", get(list_cases).post(create_case))
        .route(
            "/cases/:id",
            get(get_case).patch(update_case).delete(delete_case),
        )
        .route("/cases/:id/messages", get(list_messages).post(create_message))
        .layer(TimeoutLayer::new(state.config.request_timeout));

    let ai_routes = Router::new()
        .route("/ai/analyze", post(analyze_image))
        .route("/ai/refine", post(refine_explanation))
        .route("/ai/chat", post(chat))
        .route("/ai/analyze-video", post(analyze_video))
        .route("/ai/analyze-video/stream", post(analyze_video_stream));

    let media_routes = Router::new()
        .route("/media/probe", post(probe_upload))
        .route("/videos/:case_id/stream", get(stream_case_video));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(case_routes)
        .merge(ai_routes)
        .merge(media_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Uploads are CT clips; the extractor default of 2MB is replaced by one limit
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn_with_state(
            state.config.is_production(),
            mask_internal_errors,
        ))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
