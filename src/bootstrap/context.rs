//! Run context: the resolved configuration of one run

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::build::BuildDescriptor;
use crate::common::config::{Config, Environment};
use crate::common::{Error, Result};

/// Resolved configuration for the whole run
///
/// Built once from the [`Config`], then threaded by `&mut` through the
/// bootstrap stages; build and scenario resolution write back into it.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Scenario root; home-relative once resolved
    pub scenario: String,
    /// Registered environments, in priority order
    pub environments: Vec<Environment>,
    pub package_url: Option<String>,
    pub continue_mode: bool,
    pub version_command: String,
    /// Where the snapshot and run log go
    pub log_dir: PathBuf,
    /// Set by the build stage
    pub build: Option<BuildDescriptor>,
    /// Pass-through entries, flattened to dotted keys
    pub properties: BTreeMap<String, String>,
}

impl RunContext {
    /// Build a context from a loaded configuration
    pub fn from_config(config: Config, log_dir: PathBuf) -> Self {
        let mut properties = BTreeMap::new();
        for (key, value) in &config.properties {
            flatten_value(key, value, &mut properties);
        }

        Self {
            scenario: config.scenario.trim().to_string(),
            environments: config.environments,
            package_url: config
                .package_url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            continue_mode: config.continue_mode,
            version_command: config.version_command,
            log_dir,
            build: None,
            properties,
        }
    }

    /// Ids of the environments, in order
    pub fn env_ids(&self) -> Vec<&str> {
        self.environments.iter().map(|e| e.id.as_str()).collect()
    }

    /// The environment probed for the build and the scenario root
    pub fn first_env(&self) -> Result<&Environment> {
        self.environments.first().ok_or_else(|| {
            Error::Config("Not found any environment instance to test on it.".to_string())
        })
    }

    /// Every configuration key/value pair of the run, in a stable order
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![("scenario".to_string(), self.scenario.clone())];

        if let Some(url) = &self.package_url {
            entries.push(("package_url".to_string(), url.clone()));
        }
        entries.push(("continue_mode".to_string(), self.continue_mode.to_string()));
        entries.push(("version_command".to_string(), self.version_command.clone()));
        entries.push(("log_dir".to_string(), self.log_dir.display().to_string()));
        entries.push(("env_list".to_string(), self.env_ids().join(",")));

        for env in &self.environments {
            let prefix = format!("env.{}.ssh", env.id);
            entries.push((format!("{prefix}.host"), env.host.clone()));
            entries.push((format!("{prefix}.port"), env.port.to_string()));
            entries.push((format!("{prefix}.user"), env.user.clone()));
            if let Some(key) = &env.identity_file {
                entries.push((format!("{prefix}.identity_file"), key.display().to_string()));
            }
        }

        entries.extend(self.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        entries
    }
}

fn flatten_value(key: &str, value: &toml::Value, out: &mut BTreeMap<String, String>) {
    match value {
        toml::Value::Table(table) => {
            for (k, v) in table {
                flatten_value(&format!("{key}.{k}"), v, out);
            }
        }
        toml::Value::String(s) => {
            out.insert(key.to_string(), s.clone());
        }
        toml::Value::Array(items) => {
            let joined = items
                .iter()
                .map(|v| match v {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(",");
            out.insert(key.to_string(), joined);
        }
        other => {
            out.insert(key.to_string(), other.to_string());
        }
    }
}
