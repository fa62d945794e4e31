//! API Module
//!
//! HTTP handler and routing for the purge endpoint.
//!
//! # Endpoints
//! - `ANY /delete` - Delete every key matching the configured pattern

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
