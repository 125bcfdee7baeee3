//! Signal Module
//!
//! Shutdown on SIGINT/SIGTERM. Listeners are installed when
//! [`shutdown_signal`] is called, so a signal arriving before the returned
//! future is first polled (e.g. during the startup login) is not lost.

use std::future::Future;

use tracing::info;

/// Install the shutdown listeners and return a future resolving on the first signal
#[cfg(unix)]
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("Received SIGINT"),
            _ = terminate.recv() => info!("Received SIGTERM"),
        }
    })
}

/// Install the shutdown listener and return a future resolving on Ctrl-C
#[cfg(not(unix))]
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    let mut ctrl_c = tokio::signal::windows::ctrl_c()?;

    Ok(async move {
        ctrl_c.recv().await;
        info!("Received Ctrl-C");
    })
}
