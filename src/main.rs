//! Sentinel Purge - deletes Redis keys matching a pattern over HTTP
//!
//! # Startup Sequence
//! 1. Parse command-line flags (print usage and exit when there are none)
//! 2. Initialize tracing subscriber for logging
//! 3. Build the sentinel-backed store handle
//! 4. Ping the store, bind the listener, serve in the background
//! 5. On SIGINT/SIGTERM drain for up to 5s, close the store, exit

use std::sync::Arc;

use clap::CommandFactory;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sentinel_purge::{server, Cli, Config, SentinelStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args_os().len() < 2 {
        Cli::command().print_help()?;
        return Ok(());
    }
    let cli = match Cli::try_parse_go_style(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sentinel_purge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sentinel Purge");

    let config = Config::from(cli);
    config.log_startup();

    let store = Arc::new(SentinelStore::connect(&config)?);
    server::start(config, store)
        .await?
        .run_until(server::shutdown_signal())
        .await?;

    Ok(())
}
