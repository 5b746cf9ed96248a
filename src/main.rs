//! QA run bootstrapper
//!
//! Resolves the build under test, reconciles the scenario root against the
//! remote environments and hands the run to the test engine.

use clap::Parser;
use qa_bootstrap::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "qa-bootstrap", about = "Bootstrap a regression-test run")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
