//! API Handlers
//!
//! Request handler for the purge endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use tracing::{error, info};

use crate::config::Config;
use crate::error::StoreError;
use crate::store::{purge, KeyStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared store handle
    pub store: Arc<dyn KeyStore>,
    /// Immutable startup configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates a new AppState from a store handle and configuration.
    pub fn new(store: Arc<dyn KeyStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

/// Handler for ANY /delete
///
/// Deletes every key matching the configured pattern. The status is always
/// 200; the body is `ok` on success and the error text otherwise, so
/// callers have to read the body to tell the two apart.
///
/// The list-then-delete cycle is bounded by the configured timeout. When it
/// expires the purge is cancelled where it stands: keys already listed may
/// not have been deleted, and the body reports the timeout.
pub async fn delete_handler(State(state): State<AppState>) -> String {
    let pattern = state.config.pattern.as_str();
    let secs = state.config.timeout_secs;

    let outcome = if secs == 0 {
        purge(state.store.as_ref(), pattern).await
    } else {
        tokio::time::timeout(
            Duration::from_secs(secs),
            purge(state.store.as_ref(), pattern),
        )
        .await
        .unwrap_or(Err(StoreError::Timeout(Duration::from_secs(secs))))
    };

    match outcome {
        Ok(report) => {
            info!(
                "Purged pattern '{}': matched={}, deleted={}",
                pattern, report.matched, report.deleted
            );
            "ok".to_string()
        }
        Err(e) => {
            error!("Purge of pattern '{}' failed: {}", pattern, e);
            e.to_string()
        }
    }
}
