//! Per-run log file.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use color_eyre::eyre::{Context, Result, eyre};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber, appending plain-text records to `path_log`.
///
/// `RUST_LOG` overrides the default `info` level.
pub fn init_file_logging(path_log: &Path) -> Result<()> {
    let file_log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path_log)
        .wrap_err_with(|| format!("failed to open log file {}", path_log.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file_log))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| eyre!("failed to install log subscriber: {e}"))
}
