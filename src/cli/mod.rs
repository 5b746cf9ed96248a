//! CLI command handling
//!
//! Builds the run context and collaborators for each command and reports the
//! outcome.

use colored::Colorize;
use std::path::Path;

use crate::bootstrap::{
    self, Bootstrapper, CommandEngine, DryRunEngine, FileSnapshotWriter, HttpProbe, RunContext,
    RunOutcome, TestEngine,
};
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{logging, paths, Error, Result};
use crate::remote::SshChannel;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run { config } => run(&config).await,
        Commands::Check { config, json } => check(&config, json).await,
        Commands::Validate { config } => {
            logging::init_cli();
            let ctx = load_context(&config)?;
            bootstrap::validate(&ctx)?;

            println!("{} {}", "✓".green(), config.display());
            println!("  Scenario: {}", ctx.scenario.dimmed());
            println!("  Environments: {}", ctx.env_ids().join(", ").dimmed());
            match &ctx.package_url {
                Some(url) => println!("  Package: {}", url.dimmed()),
                None => println!("  Package: {}", "(query first environment)".dimmed()),
            }
            Ok(())
        }
    }
}

fn load_context(path: &Path) -> Result<RunContext> {
    let config = Config::load(path)?;
    let log_dir = paths::log_dir(config.log_dir.as_deref());
    Ok(RunContext::from_config(config, log_dir))
}

async fn run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let log_dir = paths::log_dir(config.log_dir.as_deref());
    let _log_guard = logging::init_run(&log_dir);

    tracing::info!("Bootstrapping run from {}", config_path.display());

    let channel = SshChannel::new(config.ssh_connect_timeout_secs);
    let probe = HttpProbe::new();
    let snapshot = FileSnapshotWriter::new(&log_dir);
    let engine: Box<dyn TestEngine> = match &config.engine.command {
        Some(command) => Box::new(CommandEngine::new(
            command.clone(),
            Some(snapshot.path().to_path_buf()),
        )),
        None => Box::new(DryRunEngine),
    };

    let mut ctx = RunContext::from_config(config, log_dir);
    let mut boot = Bootstrapper::new(&channel, &probe, &snapshot, engine.as_ref());

    match boot.run(&mut ctx).await? {
        RunOutcome::Completed => {
            println!("\n{} {}\n", "✓".green().bold(), "Run dispatched".green().bold());
        }
        RunOutcome::Aborted { reason } => {
            tracing::warn!("Run aborted before dispatch: {}", reason);
        }
    }
    Ok(())
}

async fn check(config_path: &Path, json: bool) -> Result<()> {
    logging::init_cli();

    let config = Config::load(config_path)?;
    let log_dir = paths::log_dir(config.log_dir.as_deref());
    let channel = SshChannel::new(config.ssh_connect_timeout_secs);
    let probe = HttpProbe::new();

    let mut ctx = RunContext::from_config(config, log_dir);
    bootstrap::check_build(&mut ctx, &channel, &probe, json).await?;

    let build = ctx
        .build
        .as_ref()
        .ok_or_else(|| Error::Internal("build not resolved".to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(build)?);
    } else {
        println!("{} {}", "Build Number:".cyan(), build.id.white().bold());
        println!("  Bits: {}", build.bits);
        println!("  Numbering: {:?}", build.scheme);
        println!("  Reinstall: {}", build.reinstall);
    }
    Ok(())
}
