//! Logging Module
//!
//! Console logging, plus a rolling log file when a log directory is configured.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Initialize logging
pub fn init(log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer().with_target(true);

    let file_layer = log_dir.and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Cannot create log directory {}: {}", dir.display(), e);
            return None;
        }

        // Daily rotation
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "qbt-tracker-sync.log");
        Some(fmt::layer().with_ansi(false).with_target(true).with_writer(file_appender))
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer);

    let _ = tracing::subscriber::set_global_default(subscriber);
}
