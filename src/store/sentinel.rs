//! Sentinel Store
//!
//! `KeyStore` backed by a Redis master that is located through sentinels.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::sentinel::{SentinelClient, SentinelNodeConnectionInfo, SentinelServerType};
use redis::{AsyncCommands, ErrorKind, RedisConnectionInfo, RedisError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Key, KeyStore};
use crate::config::Config;
use crate::error::{Result, StartupError, StoreError};

/// Upper bound on asking the sentinels for the master and connecting to it.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

enum Link<C> {
    /// No connection yet, or the last one broke
    Idle,
    Ready { conn: C, generation: u64 },
    Closed,
}

/// Cached master connection, tagged with a generation so an error from an
/// older connection cannot evict a newer one.
struct LinkState<C> {
    link: Link<C>,
    generation: u64,
}

impl<C: Clone> LinkState<C> {
    fn new() -> Self {
        Self {
            link: Link::Idle,
            generation: 0,
        }
    }

    /// `Ok(None)` when a new connection has to be made.
    fn current(&self) -> Result<Option<(C, u64)>> {
        match &self.link {
            Link::Ready { conn, generation } => Ok(Some((conn.clone(), *generation))),
            Link::Idle => Ok(None),
            Link::Closed => Err(StoreError::Closed),
        }
    }

    fn install(&mut self, conn: C) -> u64 {
        self.generation += 1;
        self.link = Link::Ready {
            conn,
            generation: self.generation,
        };
        self.generation
    }

    /// Forgets the connection if it is still the one from `generation`.
    fn invalidate(&mut self, generation: u64) -> bool {
        match self.link {
            Link::Ready { generation: g, .. } if g == generation => {
                self.link = Link::Idle;
                true
            }
            _ => false,
        }
    }

    fn close(&mut self) {
        self.link = Link::Closed;
    }
}

struct Inner {
    /// `None` once closed; dropping it releases the cached sentinel connections
    client: Option<SentinelClient>,
    link: LinkState<MultiplexedConnection>,
}

// == Sentinel Store ==
/// Handle to the master named in the configuration.
///
/// Building the handle does no I/O. The master is resolved through the
/// sentinels on first use and again whenever the connection to it breaks,
/// which is how a failover gets picked up.
pub struct SentinelStore {
    master_name: String,
    connect_timeout: Duration,
    inner: Mutex<Inner>,
}

impl SentinelStore {
    /// Builds a handle from configuration.
    ///
    /// Password and database index apply to the master; the sentinels
    /// themselves are queried without credentials.
    pub fn connect(config: &Config) -> std::result::Result<Self, StartupError> {
        if config.sentinels.is_empty() {
            return Err(StartupError::Config(
                "no sentinel addresses given".to_string(),
            ));
        }

        let nodes: Vec<String> = config.sentinels.iter().map(|a| sentinel_url(a)).collect();
        let master_info = SentinelNodeConnectionInfo {
            redis_connection_info: Some(RedisConnectionInfo {
                db: config.db,
                password: config.password.clone(),
                ..Default::default()
            }),
            ..Default::default()
        };

        let client = SentinelClient::build(
            nodes,
            config.master_name.clone(),
            Some(master_info),
            SentinelServerType::Master,
        )
        .map_err(|e| StartupError::Config(format!("sentinels: {}", e)))?;

        Ok(Self {
            master_name: config.master_name.clone(),
            connect_timeout: CONNECT_TIMEOUT,
            inner: Mutex::new(Inner {
                client: Some(client),
                link: LinkState::new(),
            }),
        })
    }

    /// Overrides [`CONNECT_TIMEOUT`].
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns the live connection and its generation, asking the sentinels
    /// for the master if needed.
    async fn connection(&self) -> Result<(MultiplexedConnection, u64)> {
        let mut inner = self.inner.lock().await;
        if let Some(current) = inner.link.current()? {
            return Ok(current);
        }

        debug!("Resolving master '{}' through sentinels", self.master_name);
        let client = inner.client.as_mut().ok_or(StoreError::Closed)?;
        let conn = tokio::time::timeout(self.connect_timeout, client.get_async_connection())
            .await
            .map_err(|_| StoreError::Timeout(self.connect_timeout))??;
        let generation = inner.link.install(conn.clone());
        Ok((conn, generation))
    }

    /// Drops the connection of `generation` if `err` shows it no longer
    /// reaches the current master.
    async fn observe(&self, err: RedisError, generation: u64) -> StoreError {
        if breaks_link(&err) && self.inner.lock().await.link.invalidate(generation) {
            warn!(
                "Connection to master '{}' lost ({}), will re-resolve",
                self.master_name, err
            );
        }
        StoreError::Redis(err)
    }
}

/// Errors after which the cached master connection is useless: the socket
/// is gone, or the node was demoted to a replica by a failover.
fn breaks_link(err: &RedisError) -> bool {
    err.is_connection_dropped()
        || err.is_io_error()
        || err.is_connection_refusal()
        || err.kind() == ErrorKind::ReadOnly
}

/// Turns `host:port` into a redis URL; full URLs pass through.
fn sentinel_url(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("redis://{}", addr)
    }
}

#[async_trait]
impl KeyStore for SentinelStore {
    async fn ping(&self) -> Result<()> {
        let (mut conn, generation) = self.connection().await?;
        let pong: std::result::Result<String, RedisError> =
            redis::cmd("PING").query_async(&mut conn).await;
        match pong {
            Ok(_) => Ok(()),
            Err(e) => Err(self.observe(e, generation).await),
        }
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<Key>> {
        let (mut conn, generation) = self.connection().await?;
        let keys: std::result::Result<Vec<Key>, RedisError> = conn.keys(pattern).await;
        match keys {
            Ok(keys) => Ok(keys),
            Err(e) => Err(self.observe(e, generation).await),
        }
    }

    async fn delete_keys(&self, keys: &[Key]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let (mut conn, generation) = self.connection().await?;
        let deleted: std::result::Result<usize, RedisError> = conn.del(keys.to_vec()).await;
        match deleted {
            Ok(n) => Ok(n),
            Err(e) => Err(self.observe(e, generation).await),
        }
    }

    async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.link.close();
        inner.client = None;
        info!("Closed connections for master '{}'", self.master_name);
    }
}
