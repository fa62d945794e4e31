//! API Routes
//!
//! Configures the Axum router for the purge endpoint.

use axum::{routing::any, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{delete_handler, AppState};

/// Path of the purge endpoint.
pub const DELETE: &str = "/delete";

/// Creates the router.
///
/// `/delete` accepts every HTTP method. Requests are traced through
/// `TraceLayer`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(DELETE, any(delete_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
