//! qBittorrent Tracker Sync - Main Entry Point
//!
//! Reads configuration from the environment, logs in, and keeps the default
//! tracker list up to date until SIGINT/SIGTERM.

use anyhow::Context;
use tracing::{error, info};

use qbt_tracker_sync::{config::Config, logging, signal::shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    logging::init(config.log_dir.as_deref());
    info!("qBittorrent tracker sync starting...");

    // Installed before login so an early signal takes the orderly path
    let shutdown = shutdown_signal().context("failed to install signal handlers")?;

    if let Err(e) = qbt_tracker_sync::run(config, shutdown).await {
        error!(kind = %e.kind(), "Fatal: {}", e);
        return Err(e).context("startup failed");
    }

    info!("Shut down cleanly");
    Ok(())
}
