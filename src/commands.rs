//! CLI command definitions
//!
//! Defines the clap commands for the bootstrapper CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the build and scenario root, write the snapshot and start the engine
    Run {
        /// Path to the run configuration (TOML)
        config: PathBuf,
    },

    /// Validate the configuration and resolve the build under test, without
    /// touching the scenario root or starting anything
    Check {
        /// Path to the run configuration (TOML)
        config: PathBuf,

        /// Print the build descriptor as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration locally (no network access)
    Validate {
        /// Path to the run configuration (TOML)
        config: PathBuf,
    },
}
