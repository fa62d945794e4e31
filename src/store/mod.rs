//! Store Module
//!
//! Access to the key-value store whose keys get purged.
//!
//! `SentinelStore` talks to a real Redis master discovered through
//! sentinels. `MemoryStore` keeps keys in process and is what the
//! endpoint tests run against.

#[cfg(any(test, feature = "test-support"))]
mod memory;
#[cfg(any(test, feature = "test-support"))]
mod pattern;
mod sentinel;

use async_trait::async_trait;

use crate::error::Result;

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;
#[cfg(any(test, feature = "test-support"))]
pub use pattern::{glob_match, glob_match_bytes};
pub use sentinel::SentinelStore;

/// A key name. Redis keys are binary-safe and need not be UTF-8.
pub type Key = Vec<u8>;

// == Key Store Trait ==
/// Operations the purge endpoint needs from a store.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Liveness probe.
    async fn ping(&self) -> Result<()>;

    /// Returns every key matching the glob `pattern`. Order is unspecified.
    async fn list_keys(&self, pattern: &str) -> Result<Vec<Key>>;

    /// Deletes `keys` in one batch and returns how many existed.
    ///
    /// Callers pass a non-empty slice; see [`purge`].
    async fn delete_keys(&self, keys: &[Key]) -> Result<usize>;

    /// Releases network resources. Called once at shutdown.
    async fn close(&self);
}

/// Outcome of one list-then-delete cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub matched: usize,
    pub deleted: usize,
}

/// Lists keys matching `pattern` and deletes them.
///
/// An empty match never reaches the store's delete.
pub async fn purge(store: &dyn KeyStore, pattern: &str) -> Result<PurgeReport> {
    let keys = store.list_keys(pattern).await?;
    if keys.is_empty() {
        return Ok(PurgeReport {
            matched: 0,
            deleted: 0,
        });
    }

    let deleted = store.delete_keys(&keys).await?;
    Ok(PurgeReport {
        matched: keys.len(),
        deleted,
    })
}
