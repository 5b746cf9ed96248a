//! Remote command channel
//!
//! A [`RemoteChannel`] opens [`Session`]s against registered environments.
//! Sessions are costly and stateful: whoever opens one closes it, on every
//! exit path. [`with_session`] does that for the common case.

pub mod ssh;

use async_trait::async_trait;
use std::future::Future;

use crate::common::config::Environment;
use crate::common::Result;

pub use ssh::SshChannel;

/// Capability to open sessions against environments
#[async_trait]
pub trait RemoteChannel: Send + Sync {
    /// Open a session against one environment
    async fn open(&self, env: &Environment) -> Result<Box<dyn Session>>;
}

/// A live command-execution session bound to one environment
#[async_trait]
pub trait Session: Send {
    /// Host identity used in diagnostics (`user@host:port`)
    fn host(&self) -> String;

    /// Run a script once and return its captured stdout, trimmed
    async fn execute(&mut self, script: &str) -> Result<String>;

    /// Release the session
    async fn close(&mut self) -> Result<()>;
}

/// Open a session, run `f` on it and close it whatever `f` returned
///
/// A failing close is logged, not reported: the outcome of `f` is what the
/// caller asked for.
pub async fn with_session<T, F, Fut>(channel: &dyn RemoteChannel, env: &Environment, f: F) -> Result<T>
where
    F: FnOnce(Box<dyn Session>) -> Fut,
    Fut: Future<Output = (Box<dyn Session>, Result<T>)>,
{
    let session = channel.open(env).await?;
    tracing::debug!(env = %env.id, host = %session.host(), "Session opened");

    let (mut session, outcome) = f(session).await;

    if let Err(e) = session.close().await {
        tracing::warn!(host = %session.host(), "Failed to close session: {}", e);
    } else {
        tracing::debug!(env = %env.id, "Session closed");
    }

    outcome
}
