//! QA run bootstrapper
//!
//! This library takes a run configuration to the point where a test engine
//! can start: build resolution, scenario-root reconciliation on remote hosts,
//! the audit snapshot and dispatch.

pub mod bootstrap;
pub mod cli;
pub mod commands;
pub mod common;
pub mod remote;

// Re-export commonly used types for tests
pub use bootstrap::{Bootstrapper, RunContext, RunOutcome, Stage};
pub use common::{Error, Result};
