//! Logging setup for the command line
//!
//! Log lines go to the console and to `<log_dir>/care_import.log`. The level
//! defaults to `info` (`debug` when requested) and `RUST_LOG` overrides both.

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Name of the log file inside the log directory
pub const LOG_FILENAME: &str = "care_import.log";

/// Path of the log file for a log directory
pub fn log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILENAME)
}

/// Default filter directive
pub fn default_directive(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}

/// Initialize console and file logging
///
/// # Errors
///
/// Returns error if the log directory cannot be created or a subscriber is
/// already installed
pub fn init(log_dir: &Path, debug: bool) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILENAME);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(debug)))
        .context("Failed to create env filter")?;

    let console_layer = fmt::layer().with_target(false);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::debug!("Logging to {}", log_path(log_dir).display());
    Ok(())
}
