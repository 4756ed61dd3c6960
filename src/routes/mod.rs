//! Router assembly: HTTP endpoints, static files, CORS, HTTP tracing, and the
//! mapping from `AssessmentError` to JSON error responses.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, warn, Level};

use crate::error::{AssessmentError, ErrorKind};
use crate::protocol::ErrorOut;
use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `static_dir` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>, static_dir: &str) -> Router {
    let static_service = ServeDir::new(static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(format!("{static_dir}/index.html")));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/generate_assessment", post(http::http_generate_assessment))
        .route("/api/v1/save_assessment", post(http::http_save_assessment))
        .route("/api/v1/get_history", get(http::http_get_history))
        .route("/api/v1/get_assessment/:id", get(http::http_get_assessment))
        .route("/api/v1/delete_assessment/:id", delete(http::http_delete_assessment))
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

impl IntoResponse for AssessmentError {
    fn into_response(self) -> Response {
        let (status, category) = match (self.kind(), &self) {
            (_, AssessmentError::NotFound(_)) => (StatusCode::NOT_FOUND, "Not found"),
            (ErrorKind::CallerInput, _) => (StatusCode::BAD_REQUEST, "Invalid form input"),
            (ErrorKind::MalformedOutput, _) => (StatusCode::INTERNAL_SERVER_ERROR, "llm"),
            (ErrorKind::GenerationUnavailable, _) => (StatusCode::SERVICE_UNAVAILABLE, "llm unavailable"),
            (ErrorKind::StorageUnavailable, _) => (StatusCode::INTERNAL_SERVER_ERROR, "Could not connect to database"),
            (ErrorKind::Programming, _) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        };

        if status.is_server_error() {
            error!(target: "assessment_backend", %status, error = %self, "Request failed");
        } else {
            warn!(target: "assessment_backend", %status, error = %self, "Request rejected");
        }

        (status, Json(ErrorOut { error: category, message: self.to_string() })).into_response()
    }
}
