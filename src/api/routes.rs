use crate::api::handlers::{health, outlines, presentations};
use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Routes mounted under `/api`
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/presentations", post(presentations::create_presentation))
        .route("/presentations/{id}", get(presentations::get_presentation))
        .route("/outlines/stream/{id}", get(outlines::stream_outlines))
}

/// Full application router: `/api` routes plus `/health`
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/api", create_router())
        .with_state(state)
}
