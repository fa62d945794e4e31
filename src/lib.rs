//! Sentinel Purge - deletes Redis keys matching a pattern over HTTP
//!
//! Connects to a Redis master through sentinels and exposes `/delete`,
//! which removes every key matching the configured glob pattern.

pub mod api;
pub mod config;
pub mod error;
pub mod server;
pub mod store;

pub use api::AppState;
pub use config::{Cli, Config};
pub use store::{KeyStore, SentinelStore};

#[cfg(any(test, feature = "test-support"))]
pub use store::MemoryStore;
