//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (the full wizard surface)
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers) - adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/wizard/start", post(http::http_post_start))
        .route("/api/v1/wizard/draft", get(http::http_get_draft))
        .route("/api/v1/wizard/subject", post(http::http_post_subject))
        .route("/api/v1/wizard/topic", post(http::http_post_topic))
        .route("/api/v1/wizard/step", post(http::http_post_step))
        .route("/api/v1/wizard/priority", post(http::http_post_priority))
        .route("/api/v1/wizard/priority/move", post(http::http_post_priority_move))
        .route("/api/v1/wizard/priority/suggest", post(http::http_post_apply_suggestion))
        .route("/api/v1/wizard/priority/ranks", post(http::http_post_ranks))
        .route("/api/v1/wizard/schedule", post(http::http_post_schedule))
        .route("/api/v1/wizard/generate", post(http::http_post_generate))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
