//! Route definitions for the gateway API.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        // OpenAI-compatible endpoints
        .nest("/v1", openai_routes())
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// OpenAI-compatible API routes
fn openai_routes() -> Router<AppState> {
    Router::new()
        .route("/chat/completions", post(handlers::chat_completion))
        .route("/models", get(handlers::list_models))
}
