//! Configuration file handling

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::Result;

/// Main configuration structure, one file per run
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Scenario root, as seen from the remote hosts
    #[serde(default)]
    pub scenario: String,

    /// Package URL of the build under test; absent means "whatever is installed"
    #[serde(default)]
    pub package_url: Option<String>,

    /// Resume a previously interrupted run
    #[serde(default)]
    pub continue_mode: bool,

    /// Command printing the installed build on an environment
    #[serde(default = "default_version_command")]
    pub version_command: String,

    /// Directory for the snapshot and run log
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Passed to ssh as `ConnectTimeout`
    #[serde(default = "default_connect_timeout")]
    pub ssh_connect_timeout_secs: u64,

    /// Registered execution environments, in priority order
    #[serde(default, rename = "env")]
    pub environments: Vec<Environment>,

    /// Test engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Entries the bootstrapper does not interpret; echoed into the snapshot
    #[serde(default)]
    pub properties: BTreeMap<String, toml::Value>,
}

/// A registered remote host
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Opaque environment id
    pub id: String,

    pub host: String,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    pub user: String,

    /// Private key passed to ssh with `-i`
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Test engine settings
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EngineConfig {
    /// Shell command that runs the tests; absent means dry run
    #[serde(default)]
    pub command: Option<String>,
}

fn default_version_command() -> String {
    "cubrid_rel".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_ssh_port() -> u16 {
    22
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Ids of the configured environments, in order
    pub fn env_ids(&self) -> Vec<&str> {
        self.environments.iter().map(|e| e.id.as_str()).collect()
    }
}
