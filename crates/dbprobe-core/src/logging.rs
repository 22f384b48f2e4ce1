//! Logging init: stderr by default, or a file under the XDG state dir.
//!
//! Diagnostics never go to stdout; that stream is reserved for probe
//! confirmations and the completion notice.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,dbprobe=debug,dbprobe_core=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// `~/.local/state/dbprobe/dbprobe.log`, or wherever `XDG_STATE_HOME` points.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dbprobe")?;
    Ok(xdg_dirs.get_state_home().join("dbprobe.log"))
}

/// Append structured logs to [`log_file_path`]. Errors (unwritable state
/// dir and the like) are returned so the caller can fall back to stderr.
pub fn init_logging_file() -> Result<PathBuf> {
    let path = log_file_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    tracing::info!("dbprobe logging initialized at {}", path.display());
    Ok(path)
}

/// Initialize logging to stderr only.
pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_lives_in_the_state_dir() {
        let path = log_file_path().unwrap();
        assert!(path.is_absolute(), "{}", path.display());
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("dbprobe.log"));
    }
}
