//! Local filesystem locations
//!
//! Remote paths never go through here; they are resolved on the host itself.

use std::io;
use std::path::{Path, PathBuf};

/// Name used for the application data directory
const APP_NAME: &str = "qa-bootstrap";

/// File name of the resolved-configuration snapshot
pub const SNAPSHOT_FILE: &str = "main_snapshot.properties";

/// File name of the run log
pub const LOG_FILE: &str = "bootstrap.log";

/// Get the default log directory
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.local/share/qa-bootstrap/logs`
/// - macOS: `~/Library/Application Support/qa-bootstrap/logs`
pub fn default_log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("logs"))
}

/// Pick the log directory for a run, preferring the configured one
pub fn log_dir(configured: Option<&Path>) -> PathBuf {
    configured
        .map(Path::to_path_buf)
        .or_else(default_log_dir)
        .unwrap_or_else(|| PathBuf::from(".").join("logs"))
}

/// Ensure a directory exists
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Directory holding OpenSSH control sockets for open sessions
pub fn control_socket_dir() -> PathBuf {
    std::env::temp_dir().join(APP_NAME)
}
