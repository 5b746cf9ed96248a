//! Build resolution
//!
//! The build under test comes either from the configured package URL or from
//! asking the first environment what it has installed. Both texts go through
//! the same extraction rules.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use super::context::RunContext;
use crate::common::{Error, Result};
use crate::remote::{with_session, RemoteChannel};

/// First build of the new numbering scheme
const NEW_SCHEME_FIRST_BUILD: [u64; 4] = [10, 1, 0, 6858];

static BUILD_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+\.\d+\.\d+\.\d+(?:-[0-9a-f]{7,40}\b)?").expect("valid build id pattern")
});

static BITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(32|64)[-_ ]?bits?\b").expect("valid bits pattern"));

static ARCH_64: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)x86_64|amd64|aarch64|\bx64\b").expect("valid arch pattern"));

static ARCH_32: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bi[3-6]86\b|\bx86\b").expect("valid arch pattern"));

/// Word size of the build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Bits {
    #[serde(rename = "32")]
    X32,
    #[serde(rename = "64")]
    X64,
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bits::X32 => write!(f, "32"),
            Bits::X64 => write!(f, "64"),
        }
    }
}

/// Build numbering scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingScheme {
    /// Before 10.1.0.6858
    Legacy,
    /// 10.1.0.6858 and later, optionally carrying a revision hash
    New,
}

/// The build under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildDescriptor {
    pub id: String,
    pub bits: Bits,
    pub scheme: NumberingScheme,
    /// The engine installs the package before testing
    pub reinstall: bool,
}

impl BuildDescriptor {
    /// Extract a descriptor from a package URL
    ///
    /// Only the file name counts; the host may well be an IPv4 address.
    pub fn from_package_url(url: &str) -> Result<Self> {
        Self::parse(package_file_name(url), true)
    }

    /// Extract a descriptor from a package name or version-query output
    pub fn parse(text: &str, reinstall: bool) -> Result<Self> {
        let id = extract_build_id(text).ok_or_else(|| Error::BuildInfo(text.to_string()))?;
        let bits = extract_bits(text).ok_or_else(|| Error::BuildInfo(text.to_string()))?;
        Ok(Self {
            scheme: classify(&id),
            id,
            bits,
            reinstall,
        })
    }
}

/// Last path segment of a URL, without query or fragment
pub fn package_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

/// First build identifier in `text`, e.g. `9.3.0.1234` or `10.2.0.8797-2d53d29`
pub fn extract_build_id(text: &str) -> Option<String> {
    BUILD_ID.find(text).map(|m| m.as_str().to_string())
}

/// Word size named in `text`
pub fn extract_bits(text: &str) -> Option<Bits> {
    if let Some(caps) = BITS.captures(text) {
        return match &caps[1] {
            "32" => Some(Bits::X32),
            _ => Some(Bits::X64),
        };
    }
    if ARCH_64.is_match(text) {
        Some(Bits::X64)
    } else if ARCH_32.is_match(text) {
        Some(Bits::X32)
    } else {
        None
    }
}

/// Numbering scheme of a build identifier
///
/// Only the four numeric components count; a revision suffix is ignored.
pub fn classify(id: &str) -> NumberingScheme {
    let numeric = id.split('-').next().unwrap_or(id);
    let parts: Vec<u64> = numeric.split('.').filter_map(|p| p.parse().ok()).collect();
    if parts.len() == 4 && parts.as_slice() >= NEW_SCHEME_FIRST_BUILD.as_slice() {
        NumberingScheme::New
    } else {
        NumberingScheme::Legacy
    }
}

/// Reachability check for package URLs
#[async_trait]
pub trait PackageProbe: Send + Sync {
    async fn is_reachable(&self, url: &str) -> bool;
}

/// Probe that issues an HTTP HEAD request
///
/// `file://` URLs are reachable when the file exists.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageProbe for HttpProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        if let Some(path) = url.strip_prefix("file://") {
            return std::path::Path::new(path).is_file();
        }

        match self
            .client
            .head(url)
            .header("User-Agent", "qa-bootstrap")
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                tracing::debug!("HEAD {} -> {}", url, status);
                status.is_success() || status.is_redirection()
            }
            Err(e) => {
                tracing::debug!("HEAD {} failed: {}", url, e);
                false
            }
        }
    }
}

/// Resolve the build under test and store it in the context
pub async fn resolve_build(
    ctx: &mut RunContext,
    probe: &dyn PackageProbe,
    channel: &dyn RemoteChannel,
) -> Result<()> {
    let build = match &ctx.package_url {
        Some(url) => {
            if !probe.is_reachable(url).await {
                return Err(Error::UnreachablePackage { url: url.clone() });
            }
            BuildDescriptor::from_package_url(url)?
        }
        None => {
            let env = ctx.first_env()?.clone();
            let command = ctx.version_command.clone();

            tracing::info!(env = %env.id, "Querying installed build with '{}'", command);

            let output = with_session(channel, &env, |mut session| async move {
                let result = session.execute(&command).await;
                (session, result)
            })
            .await?;

            BuildDescriptor::parse(&output, false)?
        }
    };

    tracing::info!(
        "Resolved build {} ({}bit, {:?} numbering, reinstall={})",
        build.id,
        build.bits,
        build.scheme,
        build.reinstall
    );
    ctx.build = Some(build);
    Ok(())
}
