//! Error types for the purge server
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use thiserror::Error;

// == Store Error Enum ==
/// Failure of a single store operation.
///
/// These are request-scoped: the endpoint renders them into the response
/// body and they never take the server down.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error reported by the redis client (network, protocol, sentinel lookup)
    #[error("{0}")]
    Redis(#[from] redis::RedisError),

    /// Operation did not finish within the configured bound
    #[error("i/o timeout after {0:?}")]
    Timeout(Duration),

    /// Handle was used after `close`
    #[error("client is closed")]
    Closed,

    /// Store refused the operation (used by the in-memory store)
    #[error("{0}")]
    Unavailable(String),
}

// == Startup Error Enum ==
/// Fatal errors raised before or while bringing the server up.
#[derive(Error, Debug)]
pub enum StartupError {
    /// Configuration could not be turned into a usable client or address
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Liveness probe against the store failed
    #[error("store unreachable: {0}")]
    Connection(#[source] StoreError),

    /// HTTP listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// HTTP server stopped with an error
    #[error("http server failed: {0}")]
    Serve(#[source] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
