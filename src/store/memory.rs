//! In-memory Store
//!
//! HashMap-backed `KeyStore` with failure injection and call counters,
//! used to drive the endpoint without a running Redis. Compiled for tests
//! and behind the `test-support` feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{glob_match_bytes, Key, KeyStore};
use crate::error::{Result, StoreError};

#[derive(Debug, Default)]
struct Inner {
    /// Key-value storage
    entries: HashMap<Key, String>,
    /// Injected failures, by operation
    fail_ping: Option<String>,
    fail_list: Option<String>,
    fail_delete: Option<String>,
    /// Artificial delay before listing
    latency: Duration,
    closed: bool,
}

// == Memory Store ==
/// In-process key store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    list_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `keys`, each with an empty value.
    pub fn with_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        let entries = keys.into_iter().map(|k| (k.into(), String::new())).collect();
        Self {
            inner: RwLock::new(Inner {
                entries,
                ..Inner::default()
            }),
            ..Self::default()
        }
    }

    // == Data ==
    pub async fn insert(&self, key: impl Into<Key>, value: impl Into<String>) {
        self.inner.write().await.entries.insert(key.into(), value.into());
    }

    pub async fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.inner.read().await.entries.contains_key(key.as_ref())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All keys, sorted, with invalid UTF-8 replaced.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .read()
            .await
            .entries
            .keys()
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .collect();
        keys.sort();
        keys
    }

    // == Failure Injection ==
    pub async fn fail_ping(&self, message: impl Into<String>) {
        self.inner.write().await.fail_ping = Some(message.into());
    }

    pub async fn fail_list(&self, message: impl Into<String>) {
        self.inner.write().await.fail_list = Some(message.into());
    }

    pub async fn fail_delete(&self, message: impl Into<String>) {
        self.inner.write().await.fail_delete = Some(message.into());
    }

    /// Makes every listing wait `latency` first.
    pub async fn set_latency(&self, latency: Duration) {
        self.inner.write().await.latency = latency;
    }

    // == Counters ==
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

fn check(closed: bool, failure: &Option<String>) -> Result<()> {
    if closed {
        return Err(StoreError::Closed);
    }
    match failure {
        Some(message) => Err(StoreError::Unavailable(message.clone())),
        None => Ok(()),
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        let inner = self.inner.read().await;
        check(inner.closed, &inner.fail_ping)
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<Key>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let latency = self.inner.read().await.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let inner = self.inner.read().await;
        check(inner.closed, &inner.fail_list)?;
        Ok(inner
            .entries
            .keys()
            .filter(|key| glob_match_bytes(pattern.as_bytes(), key))
            .cloned()
            .collect())
    }

    async fn delete_keys(&self, keys: &[Key]) -> Result<usize> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        let mut inner = self.inner.write().await;
        check(inner.closed, &inner.fail_delete)?;
        // missing keys are skipped, same as DEL
        Ok(keys
            .iter()
            .filter(|key| inner.entries.remove(key.as_slice()).is_some())
            .count())
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.write().await.closed = true;
    }
}
