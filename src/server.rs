//! Server Lifecycle
//!
//! Startup checks, the background HTTP task, and bounded graceful shutdown.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::error::StartupError;
use crate::store::KeyStore;

/// How long in-flight requests get to finish once shutdown starts.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A running HTTP server and the store it serves.
pub struct Server {
    local_addr: SocketAddr,
    store: Arc<dyn KeyStore>,
    handle: JoinHandle<io::Result<()>>,
    stop: oneshot::Sender<()>,
    grace: Duration,
}

/// Checks the store, binds the listener and starts serving in the background.
///
/// A failed ping aborts before anything is bound.
pub async fn start(config: Config, store: Arc<dyn KeyStore>) -> Result<Server, StartupError> {
    store.ping().await.map_err(StartupError::Connection)?;
    info!("Store reachable");

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    let local_addr = listener.local_addr().map_err(|source| StartupError::Bind {
        addr: addr.clone(),
        source,
    })?;

    let app = create_router(AppState::new(store.clone(), config));
    let (stop, stopped) = oneshot::channel::<()>();

    info!("server listen on {}", local_addr);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                // a dropped sender also means stop
                let _ = stopped.await;
            })
            .await
    });

    Ok(Server {
        local_addr,
        store,
        handle,
        stop,
        grace: SHUTDOWN_GRACE,
    })
}

impl Server {
    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Overrides the shutdown grace period.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Serves until `shutdown` resolves, then drains and closes the store.
    ///
    /// Returns an error if the HTTP task stops on its own first.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {}
            joined = &mut self.handle => {
                let err = match joined {
                    Ok(Ok(())) => io::Error::other("server exited unexpectedly"),
                    Ok(Err(e)) => e,
                    Err(e) => io::Error::other(e),
                };
                error!("HTTP server stopped: {}", err);
                return Err(StartupError::Serve(err));
            }
        }

        // stop accepting, let in-flight requests finish
        let _ = self.stop.send(());
        match tokio::time::timeout(self.grace, &mut self.handle).await {
            Ok(Ok(Err(e))) => warn!("HTTP server error during shutdown: {}", e),
            Ok(_) => info!("HTTP server drained"),
            Err(_) => {
                warn!(
                    "Requests still in flight after {:?}, abandoning them",
                    self.grace
                );
                self.handle.abort();
            }
        }

        self.store.close().await;
        info!("shutting down");
        Ok(())
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
