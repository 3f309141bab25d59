//! Logging configuration for db-frames.
//!
//! Logs go to stderr by default so that stdout carries only the query result,
//! or to a file when one is configured.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Builds the filter from RUST_LOG, falling back to `default_level`.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initializes logging to stderr.
pub fn init_stderr_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .init();
}

/// Initializes logging to the file at `path`, truncating it.
///
/// Falls back to stderr logging if the file cannot be created.
pub fn init_file_logging(path: &Path, default_level: &str) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            init_stderr_logging(default_level);
            return;
        }
    }

    let log_file = match File::create(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {e}");
            init_stderr_logging(default_level);
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(log_file)
        .with_ansi(false) // No ANSI colors in file output
        .init();
}

/// Returns the default path for the log file.
///
/// Uses the XDG state directory on Linux (`~/.local/state/db-frames/frames.log`),
/// or falls back to the config directory on other platforms.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("db-frames").join("frames.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("db-frames").join("frames.log");
    }

    std::env::temp_dir().join("frames.log")
}
