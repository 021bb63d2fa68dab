//! Logging setup: one log file per run under the XDG state dir, with the
//! previous run kept next to it, or plain stderr.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,jenkins_artifacts=debug";

/// Initialize structured logging to `~/.local/state/jenkins-artifacts/client.log`.
/// Each run starts a fresh file; the previous run survives as `client.log.1`.
/// On failure (e.g. state dir unwritable), returns Err so the caller can fall
/// back to stderr.
pub fn init_logging() -> Result<()> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("jenkins-artifacts")?;
    let log_path = xdg_dirs.place_state_file("client.log")?;
    rotate_previous(&log_path)?;
    let file = File::create(&log_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    tracing::info!("logging initialized at {}", log_path.display());

    Ok(())
}

/// Initialize logging to stderr only (no file). Use when init_logging() fails.
pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Keep exactly one earlier log: `client.log` becomes `client.log.1`,
/// replacing any older rotation.
fn rotate_previous(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::rename(path, path.with_extension("log.1"))?;
    }
    Ok(())
}
