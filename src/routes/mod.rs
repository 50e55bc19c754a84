//! Router assembly: JSON API, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
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

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - Static site (front-end, `video-list.json`, `CaptionData/`) with index fallback
/// - CORS (allow any origin/method/headers); adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let static_service = ServeDir::new(&static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(format!("{}/index.html", static_dir.trim_end_matches('/'))));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Catalog and words
        .route("/api/v1/videos", get(http::http_list_videos))
        .route("/api/v1/videos/:video_id/words", get(http::http_video_words))
        .route("/api/v1/videos/:video_id/thumbnail", get(http::http_thumbnail))
        // Flashcard sessions
        .route("/api/v1/sessions", post(http::http_start_session))
        .route("/api/v1/sessions/:session_id", get(http::http_get_session))
        .route("/api/v1/sessions/:session_id/reveal", post(http::http_reveal))
        .route("/api/v1/sessions/:session_id/next", post(http::http_next))
        .route("/api/v1/sessions/:session_id/previous", post(http::http_previous))
        .route("/api/v1/sessions/:session_id/unknown", post(http::http_mark_unknown))
        // Profiles and unknown words
        .route("/api/v1/users/sign_in", post(http::http_sign_in))
        .route("/api/v1/users/:uid", get(http::http_get_profile))
        .route("/api/v1/users/:uid/counters", post(http::http_increment_counter))
        .route("/api/v1/users/:uid/recalculate", post(http::http_recalculate))
        .route(
            "/api/v1/users/:uid/unknown_words",
            get(http::http_list_unknown_words).post(http::http_add_unknown_word),
        )
        .route(
            "/api/v1/users/:uid/unknown_words/:word_id",
            patch(http::http_update_unknown_word).delete(http::http_delete_unknown_word),
        )
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
