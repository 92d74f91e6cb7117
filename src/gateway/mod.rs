//! Thin HTTP surface over the pipeline and task manager.

pub mod error;
pub mod handler;
pub mod payload;
pub mod state;

pub use error::GatewayError;
pub use state::HandlerState;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Builds the application router.
pub fn create_router(state: HandlerState) -> Router {
    Router::new()
        .route("/detect_text", post(handler::detect_text))
        .route("/detect_text_initial", post(handler::detect_text_initial))
        .route("/submit_feedback", post(handler::submit_feedback))
        .route("/cancel_session", post(handler::cancel_session))
        .route("/session_tasks", get(handler::session_tasks))
        .route("/cleanup_expired", post(handler::cleanup_expired))
        .route("/health", get(handler::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
