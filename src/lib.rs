//! qBittorrent Tracker Sync Library
//!
//! Periodically replaces the qBittorrent default tracker list with a public
//! tracker list, keeping the Web UI session alive across expiries.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod session;
pub mod signal;
pub mod sync;
pub mod trigger;

use std::future::Future;
use std::sync::Arc;

use tracing::info;

use auth::Authenticator;
use client::ResilientClient;
use config::Config;
use scheduler::Scheduler;
use session::SessionStore;
use sync::UpdateJob;

pub use error::{Error, ErrorKind, Result};

/// Run the updater until `shutdown` resolves
///
/// The initial login happens before anything is scheduled; its failure is
/// returned without arming a trigger. After `shutdown` resolves the running
/// update (if any) is drained and the session is logged out.
pub async fn run<F>(config: Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let http = client::http_client()?;
    let store = SessionStore::new();
    let auth = Arc::new(Authenticator::new(http.clone(), &config, store));

    auth.login().await?;

    let client = Arc::new(ResilientClient::new(http, Arc::clone(&auth)));
    let job = Arc::new(UpdateJob::new(client, &config));

    info!("Creating the schedule job with cron {}", config.trigger);
    let handle = Scheduler::new(config.trigger.clone(), job, auth).start();

    shutdown.await;
    info!("Shutting down");
    handle.shutdown().await;

    Ok(())
}
