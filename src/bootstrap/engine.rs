//! Test-engine dispatch
//!
//! The engine that actually runs scenarios lives outside this crate. It is
//! reached either through a configured shell command or not at all (dry run).

use async_trait::async_trait;
use colored::Colorize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use super::context::RunContext;
use super::snapshot::{BITS_KEY, VERSION_KEY};
use crate::common::{Error, Result};

/// Consumer of a completed run context
#[async_trait]
pub trait TestEngine: Send + Sync {
    async fn execute(&self, ctx: &RunContext) -> Result<()>;
}

/// Environment variables describing a completed context
pub fn engine_env(ctx: &RunContext) -> Vec<(String, String)> {
    let mut vars = vec![
        ("SCENARIO".to_string(), ctx.scenario.clone()),
        ("ENV_LIST".to_string(), ctx.env_ids().join(",")),
        ("CONTINUE_MODE".to_string(), ctx.continue_mode.to_string()),
    ];
    if let Some(build) = &ctx.build {
        vars.push((VERSION_KEY.to_string(), build.id.clone()));
        vars.push((BITS_KEY.to_string(), build.bits.to_string()));
        vars.push(("REINSTALL_BUILD".to_string(), build.reinstall.to_string()));
    }
    if let Some(url) = &ctx.package_url {
        vars.push(("PACKAGE_URL".to_string(), url.clone()));
    }
    vars
}

/// Runs a shell command with the context exported as environment variables
pub struct CommandEngine {
    command: String,
    snapshot_file: Option<PathBuf>,
}

impl CommandEngine {
    pub fn new(command: impl Into<String>, snapshot_file: Option<PathBuf>) -> Self {
        Self {
            command: command.into(),
            snapshot_file,
        }
    }
}

#[async_trait]
impl TestEngine for CommandEngine {
    async fn execute(&self, ctx: &RunContext) -> Result<()> {
        tracing::info!("Dispatching to test engine: {}", self.command);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .envs(engine_env(ctx))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(snapshot) = &self.snapshot_file {
            cmd.env("SNAPSHOT_FILE", snapshot);
        }

        let status = cmd
            .status()
            .await
            .map_err(|e| Error::Engine(format!("failed to start '{}': {}", self.command, e)))?;

        if !status.success() {
            return Err(Error::Engine(format!(
                "'{}' exited with code {:?}",
                self.command,
                status.code()
            )));
        }
        Ok(())
    }
}

/// Prints the context instead of running anything
pub struct DryRunEngine;

#[async_trait]
impl TestEngine for DryRunEngine {
    async fn execute(&self, ctx: &RunContext) -> Result<()> {
        println!("\n{}", "No engine command configured; dry run:".yellow());
        for (key, value) in engine_env(ctx) {
            println!("  {}={}", key, value.dimmed());
        }
        Ok(())
    }
}
