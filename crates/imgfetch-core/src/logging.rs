//! Logging init: file under XDG state dir, or graceful fallback to stderr.
//!
//! `RUST_LOG` overrides the default filters in both modes.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Default filter for the log file: pipeline steps are logged at debug.
const FILE_FILTER: &str = "info,imgfetch=debug,imgfetch_core=debug";
/// Default filter for stderr, where log lines mix with command output.
const STDERR_FILTER: &str = "warn";

/// Where log output ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// `~/.local/state/imgfetch/imgfetch.log`, creating the directory if needed.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("imgfetch")?;
    Ok(xdg_dirs.place_state_file("imgfetch.log")?)
}

/// Append structured logs to `path`.
pub fn init_logging_to(path: &Path) -> Result<()> {
    let file = fs::OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(FILE_FILTER))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    tracing::info!("imgfetch logging initialized at {}", path.display());
    Ok(())
}

/// Initialize logging to stderr only (no file).
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(STDERR_FILTER))
        .with_writer(std::io::stderr)
        .try_init();
}

/// Log to the XDG state file, falling back to stderr so the CLI never fails on logging.
pub fn init_logging() -> LogTarget {
    match log_file_path().and_then(|p| init_logging_to(&p).map(|()| p)) {
        Ok(path) => LogTarget::File(path),
        Err(e) => {
            init_logging_stderr();
            tracing::warn!("file logging unavailable ({:#}), using stderr", e);
            LogTarget::Stderr
        }
    }
}
