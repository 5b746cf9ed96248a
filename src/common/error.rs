//! Error types for the run bootstrapper
//!
//! Messages name the offending config key or host so an operator can fix the
//! run without reading logs.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Exit status used when the configured package URL cannot be reached
pub const EXIT_UNREACHABLE_PACKAGE: i32 = 2;

/// Exit status for every other fatal error
pub const EXIT_FAILURE: i32 = 1;

/// Main error type for the bootstrapper
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Build Resolution Errors ===
    #[error("Please confirm {url} url is available!")]
    UnreachablePackage { url: String },

    #[error("Cannot determine build from '{0}'")]
    BuildInfo(String),

    // === Scenario Errors ===
    #[error("The directory in 'scenario' ({scenario}) does not exist. Please check it again at {host}.")]
    ScenarioNotFound { scenario: String, host: String },

    // === Transport Errors ===
    #[error("Failed to open session to environment '{env}': {reason}")]
    SessionOpen { env: String, reason: String },

    #[error("Remote command failed on {host}: {message}")]
    Transport { host: String, message: String },

    // === Dispatch Errors ===
    #[error("Test engine failed: {0}")]
    Engine(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a session open error for an environment
    pub fn session_open(env: &str, reason: impl ToString) -> Self {
        Self::SessionOpen {
            env: env.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a transport error for a host
    pub fn transport(host: &str, message: impl ToString) -> Self {
        Self::Transport {
            host: host.to_string(),
            message: message.to_string(),
        }
    }

    /// Process exit status for this error
    ///
    /// An unreachable package URL gets its own status so wrapper scripts can
    /// tell "build not published yet" apart from a broken configuration.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::UnreachablePackage { .. } => EXIT_UNREACHABLE_PACKAGE,
            _ => EXIT_FAILURE,
        }
    }
}
