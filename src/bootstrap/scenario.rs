//! Scenario root reconciliation
//!
//! The engine re-joins the scenario root against each environment's own home
//! directory, so a root inside the probed host's home is rewritten relative
//! to it. Roots outside home are taken to be the same path on every host and
//! pass through untouched.

use crate::common::{Error, Result};
use crate::remote::Session;

/// Line the probe script prints when the scenario root is not a directory
pub const DIR_NOT_FOUND: &str = "DIR_NOT_FOUND";

/// Prints the canonical home directory
const HOME_QUERY: &str = "echo $(cd $HOME; pwd)";

/// Outcome of probing the scenario root on a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioProbe {
    /// Canonical absolute path of the directory
    Found(String),
    NotFound,
}

impl ScenarioProbe {
    /// Interpret the probe script's trimmed output
    ///
    /// The marker only counts as a whole line, so a directory that merely has
    /// the marker in its name is still found.
    pub fn parse(output: &str) -> Self {
        if output.lines().any(|line| line.trim() == DIR_NOT_FOUND) {
            ScenarioProbe::NotFound
        } else {
            ScenarioProbe::Found(output.trim().to_string())
        }
    }
}

/// Script that checks the directory then prints its canonical form
///
/// The path is left unquoted so `~` and `$VAR` expand on the remote side.
pub fn probe_script(scenario: &str) -> String {
    format!(
        "if [ ! -d {scenario} ]; then echo {DIR_NOT_FOUND}; fi\necho $(cd {scenario}; pwd)"
    )
}

/// Express `canonical` relative to `home` when it lies inside it
///
/// Returns `.` for the home directory itself and `raw` for anything outside.
/// Containment is decided per path component: `/home/qa2` is not inside
/// `/home/qa`.
pub fn relativize(home: &str, canonical: &str, raw: &str) -> String {
    let home = home.trim_end_matches('/');

    if canonical == home || (home.is_empty() && canonical == "/") {
        return ".".to_string();
    }

    match canonical.strip_prefix(home) {
        Some(rest) if rest.starts_with('/') && rest.len() > 1 => rest[1..].to_string(),
        _ => raw.to_string(),
    }
}

/// Resolve the scenario root against the host behind `session`
///
/// The caller owns `session` and closes it, including when this fails.
pub async fn resolve_scenario(session: &mut dyn Session, scenario: &str) -> Result<String> {
    let home = session.execute(HOME_QUERY).await?;
    if home.is_empty() {
        return Err(Error::transport(&session.host(), "empty home directory"));
    }

    let output = session.execute(&probe_script(scenario)).await?;

    match ScenarioProbe::parse(&output) {
        ScenarioProbe::NotFound => Err(Error::ScenarioNotFound {
            scenario: scenario.to_string(),
            host: session.host(),
        }),
        ScenarioProbe::Found(canonical) if canonical.is_empty() => Err(Error::transport(
            &session.host(),
            "empty output while resolving scenario",
        )),
        ScenarioProbe::Found(canonical) => {
            let resolved = relativize(&home, &canonical, scenario);
            tracing::debug!(
                home = %home,
                canonical = %canonical,
                "Scenario '{}' resolved to '{}'",
                scenario,
                resolved
            );
            Ok(resolved)
        }
    }
}
