//! Router assembly: HTTP endpoints, CORS, HTTP tracing and a JSON 404 fallback.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - `/health` liveness probe
/// - AI endpoints under `/api/...` (challenges, questions, verification, chat)
/// - local grading, the challenge bank, and progress endpoints
/// - CORS (allow any origin/method/headers) since the SPA is served elsewhere
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::http_health))
        // AI gateway
        .route("/api/generate-challenges", post(http::http_generate_challenges))
        .route("/api/generate-questions", post(http::http_generate_questions))
        .route("/api/verify-code", post(http::http_verify_code))
        .route("/api/chat", post(http::http_chat))
        // Local grading + content
        .route("/api/validate", post(http::http_validate))
        .route("/api/nodes/:node_id/challenges", get(http::http_node_challenges))
        // Progress
        .route("/api/progress/:user_id", get(http::http_get_progress))
        .route("/api/progress/:user_id/complete", post(http::http_complete_node))
        .route("/api/progress/:user_id/badges/:badge", post(http::http_award_badge))
        .fallback(http::http_not_found)
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
}
