//! Run bootstrapper
//!
//! Takes a loaded configuration to the point where the test engine can run:
//!
//! `Init → ValidateConfig → ResolveBuild → ResolveScenario → Snapshot → Dispatch`
//!
//! ending in `Completed`, or in `Aborted` when the scenario root is missing on
//! the probed host. Every other failure is returned to the caller.

pub mod build;
pub mod context;
pub mod engine;
pub mod scenario;
pub mod snapshot;

use colored::Colorize;
use std::collections::HashSet;

use crate::common::{Error, Result};
use crate::remote::{with_session, RemoteChannel};

pub use build::{BuildDescriptor, Bits, HttpProbe, NumberingScheme, PackageProbe};
pub use context::RunContext;
pub use engine::{CommandEngine, DryRunEngine, TestEngine};
pub use snapshot::{FileSnapshotWriter, SnapshotWriter};

/// Bootstrap stages, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ValidateConfig,
    ResolveBuild,
    ResolveScenario,
    Snapshot,
    Dispatch,
    Completed,
    Aborted,
}

/// How a run that did not fail ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The engine was invoked
    Completed,
    /// Stopped before dispatch; nothing ran
    Aborted { reason: String },
}

/// Check the configuration before anything touches the network
pub fn validate(ctx: &RunContext) -> Result<()> {
    if ctx.scenario.trim().is_empty() {
        return Err(Error::Config(
            "The parameter 'scenario' must be set correctly".to_string(),
        ));
    }

    ctx.first_env()?;

    let mut seen = HashSet::new();
    for env in &ctx.environments {
        if !seen.insert(env.id.as_str()) {
            return Err(Error::Config(format!("Duplicate environment id '{}'", env.id)));
        }
    }
    Ok(())
}

/// Validate the context and resolve the build, without touching the
/// scenario root
///
/// Needs only the channel (for the live query) and the package check.
pub async fn check_build(
    ctx: &mut RunContext,
    channel: &dyn RemoteChannel,
    probe: &dyn PackageProbe,
    quiet: bool,
) -> Result<()> {
    validate(ctx)?;
    resolve_validated_build(ctx, channel, probe, quiet).await
}

async fn resolve_validated_build(
    ctx: &mut RunContext,
    channel: &dyn RemoteChannel,
    probe: &dyn PackageProbe,
    quiet: bool,
) -> Result<()> {
    tracing::info!(envs = ?ctx.env_ids(), continue_mode = ctx.continue_mode, "Configuration valid");
    if !quiet {
        println!("{} {:?}", "Available Env:".cyan(), ctx.env_ids());
        println!("{} {}", "Continue Mode:".cyan(), ctx.continue_mode);
        println!(
            "{} {}",
            "Test Build:".cyan(),
            ctx.package_url.as_deref().unwrap_or("(installed)")
        );
    }

    build::resolve_build(ctx, probe, channel).await
}

/// Sequences the bootstrap stages over one run context
pub struct Bootstrapper<'a> {
    channel: &'a dyn RemoteChannel,
    probe: &'a dyn PackageProbe,
    snapshot: &'a dyn SnapshotWriter,
    engine: &'a dyn TestEngine,
    stages: Vec<Stage>,
    quiet: bool,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(
        channel: &'a dyn RemoteChannel,
        probe: &'a dyn PackageProbe,
        snapshot: &'a dyn SnapshotWriter,
        engine: &'a dyn TestEngine,
    ) -> Self {
        Self {
            channel,
            probe,
            snapshot,
            engine,
            stages: vec![Stage::Init],
            quiet: false,
        }
    }

    /// Keep stdout free of progress lines
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Stages entered so far
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!("Entering {:?}", stage);
        self.stages.push(stage);
    }

    /// Run every stage through dispatch
    pub async fn run(&mut self, ctx: &mut RunContext) -> Result<RunOutcome> {
        self.enter(Stage::ValidateConfig);
        validate(ctx)?;
        self.enter(Stage::ResolveBuild);
        resolve_validated_build(ctx, self.channel, self.probe, self.quiet).await?;

        self.enter(Stage::ResolveScenario);
        match self.resolve_scenario(ctx).await {
            Ok(resolved) => ctx.scenario = resolved,
            Err(e @ Error::ScenarioNotFound { .. }) => {
                println!("{}{}", "[ERROR]".red().bold(), e);
                tracing::error!("{}", e);
                self.enter(Stage::Aborted);
                return Ok(RunOutcome::Aborted {
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }

        if let (Some(build), false) = (&ctx.build, self.quiet) {
            println!("{} {}", "Build Number:".cyan(), build.id.white().bold());
        }

        self.enter(Stage::Snapshot);
        self.snapshot.write(&snapshot::snapshot_lines(ctx))?;

        self.enter(Stage::Dispatch);
        self.engine.execute(ctx).await?;

        self.enter(Stage::Completed);
        Ok(RunOutcome::Completed)
    }

    // TODO: probe every environment, not just the first; a root missing on
    // a later host only surfaces once the engine reaches it.
    async fn resolve_scenario(&self, ctx: &RunContext) -> Result<String> {
        let env = ctx.first_env()?.clone();
        let raw = ctx.scenario.clone();

        with_session(self.channel, &env, |mut session| async move {
            let result = scenario::resolve_scenario(session.as_mut(), &raw).await;
            (session, result)
        })
        .await
    }
}
