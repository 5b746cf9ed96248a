//! Logging and tracing configuration
//!
//! Logs go to stderr, and additionally to `bootstrap.log` in the run's log
//! directory when that directory is writable.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qa_bootstrap=info,warn"))
}

/// Initialize tracing for commands that do not touch a log directory
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing for a run (file + stderr logging)
///
/// Returns the log file path and the appender guard; the guard must live
/// until the run ends or buffered lines are lost.
pub fn init_run(log_dir: &Path) -> Option<(PathBuf, WorkerGuard)> {
    if let Err(e) = paths::ensure_dir(log_dir) {
        eprintln!("Warning: Could not create log directory {}: {}", log_dir.display(), e);
        init_cli();
        return None;
    }

    let appender = tracing_appender::rolling::never(log_dir, paths::LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Some((log_dir.join(paths::LOG_FILE), guard))
}
