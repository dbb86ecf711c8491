pub mod health;

use axum::{
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderValue, StatusCode,
    },
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::errors::AppError;
use crate::generation::handlers::handle_generate;
use crate::persistence::handlers::{handle_get_problems, handle_save_problems};
use crate::state::AppState;

const GENERATE_METHODS: &str = "POST, OPTIONS";
const PROBLEMS_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Answers a bare OPTIONS request with 204 and the endpoint's CORS headers.
fn preflight(methods: &'static str) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (ACCESS_CONTROL_ALLOW_METHODS, methods),
            (ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS),
        ],
    )
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Every route answers cross-origin callers; preflights are handled per route.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/generate",
            post(handle_generate)
                .options(|| async { preflight(GENERATE_METHODS) })
                .fallback(method_not_allowed),
        )
        .route(
            "/api/problems",
            get(handle_get_problems)
                .post(handle_save_problems)
                .options(|| async { preflight(PROBLEMS_METHODS) })
                .fallback(method_not_allowed),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .with_state(state)
}
