//! Resolved-configuration snapshot

use std::io::Write;
use std::path::{Path, PathBuf};

use super::context::RunContext;
use crate::common::{paths, Error, Result};

pub const VERSION_KEY: &str = "AUTO_TEST_VERSION";
pub const BITS_KEY: &str = "AUTO_TEST_BITS";

/// Persists the snapshot lines of a run
pub trait SnapshotWriter: Send + Sync {
    fn write(&self, lines: &[String]) -> Result<()>;
}

/// `key=value` lines for every resolved entry, then the two build keys
pub fn snapshot_lines(ctx: &RunContext) -> Vec<String> {
    let mut lines: Vec<String> = ctx
        .entries()
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();

    if let Some(build) = &ctx.build {
        lines.push(format!("{VERSION_KEY}={}", build.id));
        lines.push(format!("{BITS_KEY}={}", build.bits));
    }
    lines
}

/// Writes `main_snapshot.properties` into a log directory, replacing any
/// previous snapshot
pub struct FileSnapshotWriter {
    path: PathBuf,
}

impl FileSnapshotWriter {
    pub fn new(log_dir: &Path) -> Self {
        Self {
            path: log_dir.join(paths::SNAPSHOT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotWriter for FileSnapshotWriter {
    fn write(&self, lines: &[String]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            paths::ensure_dir(dir)?;
        }

        let mut file = std::fs::File::create(&self.path).map_err(|e| {
            Error::Internal(format!("Failed to create snapshot {}: {}", self.path.display(), e))
        })?;
        for line in lines {
            writeln!(file, "{line}")?;
        }

        tracing::info!("Snapshot written to {}", self.path.display());
        Ok(())
    }
}
