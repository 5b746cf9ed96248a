//! End-to-end tests for the run bootstrapper
//!
//! These tests drive a full run through the library with an in-memory
//! remote channel, and exercise the binary's exit statuses:
//! 1. Build resolution from a package URL and from a live host
//! 2. Scenario root reconciliation against the remote home
//! 3. Snapshot contents and dispatch

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use qa_bootstrap::bootstrap::scenario::{probe_script, resolve_scenario};
use qa_bootstrap::bootstrap::{FileSnapshotWriter, PackageProbe, TestEngine};
use qa_bootstrap::common::config::{Config, Environment};
use qa_bootstrap::remote::{RemoteChannel, Session};
use qa_bootstrap::{Bootstrapper, Error, Result, RunContext, RunOutcome};

const HOME_QUERY: &str = "echo $(cd $HOME; pwd)";

/// Remote host simulated by a script → output table
#[derive(Clone, Default)]
struct FakeHost {
    replies: HashMap<String, String>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl FakeHost {
    fn with_home(home: &str) -> Self {
        let mut host = Self::default();
        host.replies.insert(HOME_QUERY.to_string(), home.to_string());
        host
    }

    fn scenario(mut self, raw: &str, output: &str) -> Self {
        self.replies.insert(probe_script(raw), output.to_string());
        self
    }

    fn reply(mut self, script: &str, output: &str) -> Self {
        self.replies.insert(script.to_string(), output.to_string());
        self
    }

    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

struct FakeSession {
    host: FakeHost,
}

#[async_trait]
impl RemoteChannel for FakeHost {
    async fn open(&self, _env: &Environment) -> Result<Box<dyn Session>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession { host: self.clone() }))
    }
}

#[async_trait]
impl Session for FakeSession {
    fn host(&self) -> String {
        "qa@fake-host:22".to_string()
    }

    async fn execute(&mut self, script: &str) -> Result<String> {
        self.host
            .replies
            .get(script)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| Error::transport("qa@fake-host:22", format!("no reply for {script:?}")))
    }

    async fn close(&mut self) -> Result<()> {
        self.host.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct AlwaysReachable;

#[async_trait]
impl PackageProbe for AlwaysReachable {
    async fn is_reachable(&self, _url: &str) -> bool {
        true
    }
}

#[derive(Default)]
struct RecordingEngine {
    runs: AtomicUsize,
}

#[async_trait]
impl TestEngine for RecordingEngine {
    async fn execute(&self, _ctx: &RunContext) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn temp_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("qa-bootstrap-tests").join(test_name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

fn context(scenario: &str, package_url: Option<&str>, log_dir: &Path) -> RunContext {
    let mut toml = format!("scenario = '{scenario}'\n");
    if let Some(url) = package_url {
        toml.push_str(&format!("package_url = '{url}'\n"));
    }
    toml.push_str(
        r#"
        [[env]]
        id = "instance1"
        host = "10.0.0.1"
        user = "qa"

        [[env]]
        id = "instance2"
        host = "10.0.0.2"
        user = "qa"

        [properties]
        test_category = "shell"
        "#,
    );
    RunContext::from_config(Config::parse(&toml).unwrap(), log_dir.to_path_buf())
}

#[tokio::test]
async fn test_end_to_end_with_package_url() {
    let log_dir = temp_dir("end_to_end_with_package_url");
    let host = FakeHost::with_home("/home/qa").scenario("~/tests/case1", "/home/qa/tests/case1");
    let snapshot = FileSnapshotWriter::new(&log_dir);
    let engine = RecordingEngine::default();
    let mut ctx = context(
        "~/tests/case1",
        Some("https://example/build-9.3.0.1234-64bit"),
        &log_dir,
    );

    let mut boot = Bootstrapper::new(&host, &AlwaysReachable, &snapshot, &engine);
    let outcome = boot.run(&mut ctx).await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(engine.runs.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.scenario, "tests/case1");
    assert!(ctx.build.as_ref().unwrap().reinstall);

    let content = fs::read_to_string(log_dir.join("main_snapshot.properties")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert!(lines.contains(&"AUTO_TEST_VERSION=9.3.0.1234"));
    assert!(lines.contains(&"AUTO_TEST_BITS=64"));
    assert!(lines.contains(&"scenario=tests/case1"));
    assert!(lines.contains(&"env_list=instance1,instance2"));
    assert!(lines.contains(&"test_category=shell"));

    // Only the scenario probe needed a session
    assert_eq!(host.opened(), 1);
    assert_eq!(host.closed(), 1);
}

#[tokio::test]
async fn test_end_to_end_with_installed_build() {
    let log_dir = temp_dir("end_to_end_with_installed_build");
    let host = FakeHost::with_home("/home/qa")
        .scenario("/home/qa", "/home/qa")
        .reply(
            "cubrid_rel",
            "\nCUBRID 10.1 (10.1.0.6929-b049ba5) (64bit release build for Linux) (Nov 13 2017)\n",
        );
    let snapshot = FileSnapshotWriter::new(&log_dir);
    let engine = RecordingEngine::default();
    let mut ctx = context("/home/qa", None, &log_dir);

    let mut boot = Bootstrapper::new(&host, &AlwaysReachable, &snapshot, &engine);
    let outcome = boot.run(&mut ctx).await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(ctx.scenario, ".");
    let build = ctx.build.as_ref().unwrap();
    assert_eq!(build.id, "10.1.0.6929-b049ba5");
    assert!(!build.reinstall);
    assert_eq!(host.opened(), 2);
    assert_eq!(host.closed(), 2);

    let content = fs::read_to_string(snapshot.path()).unwrap();
    assert!(content.contains("AUTO_TEST_VERSION=10.1.0.6929-b049ba5\n"));
}

#[tokio::test]
async fn test_missing_scenario_is_graceful_abort() {
    let log_dir = temp_dir("missing_scenario_is_graceful_abort");
    let host = FakeHost::with_home("/home/qa").scenario("~/nope", "DIR_NOT_FOUND\n/home/qa");
    let snapshot = FileSnapshotWriter::new(&log_dir);
    let engine = RecordingEngine::default();
    let mut ctx = context("~/nope", Some("https://example/build-9.3.0.1234-64bit"), &log_dir);

    let mut boot = Bootstrapper::new(&host, &AlwaysReachable, &snapshot, &engine);
    let outcome = boot.run(&mut ctx).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Aborted { .. }));
    assert_eq!(engine.runs.load(Ordering::SeqCst), 0);
    assert!(!snapshot.path().exists());
    assert_eq!(host.opened(), 1);
    assert_eq!(host.closed(), 1);
}

#[tokio::test]
async fn test_resolver_outside_home_keeps_raw_string() {
    let host = FakeHost::with_home("/home/qa").scenario("/opt/shared/./tests", "/opt/shared/tests");
    let env = Environment {
        id: "instance1".into(),
        host: "10.0.0.1".into(),
        port: 22,
        user: "qa".into(),
        identity_file: None,
    };

    let mut session = host.open(&env).await.unwrap();
    let resolved = resolve_scenario(session.as_mut(), "/opt/shared/./tests").await;
    session.close().await.unwrap();

    assert_eq!(resolved.unwrap(), "/opt/shared/./tests");
}

#[tokio::test]
async fn test_resolver_reports_host_when_missing() {
    let host = FakeHost::with_home("/home/qa").scenario("cases", "DIR_NOT_FOUND");
    let env = Environment {
        id: "instance1".into(),
        host: "10.0.0.1".into(),
        port: 22,
        user: "qa".into(),
        identity_file: None,
    };

    let mut session = host.open(&env).await.unwrap();
    let err = resolve_scenario(session.as_mut(), "cases").await.unwrap_err();
    session.close().await.unwrap();

    match err {
        Error::ScenarioNotFound { host, scenario } => {
            assert_eq!(host, "qa@fake-host:22");
            assert_eq!(scenario, "cases");
        }
        other => panic!("expected ScenarioNotFound, got {other:?}"),
    }
}

/// Write a config file for the binary tests
fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("run.toml");
    fs::write(&path, body).expect("Failed to write config");
    path
}

fn bootstrap_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_qa-bootstrap"))
}

#[test]
fn test_binary_validate_rejects_empty_env_list() {
    let dir = temp_dir("binary_validate_rejects_empty_env_list");
    let config = write_config(&dir, "scenario = '~/cases'\n");

    let output = bootstrap_bin()
        .arg("validate")
        .arg(&config)
        .output()
        .expect("Failed to run qa-bootstrap");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not found any environment instance"));
}

#[test]
fn test_binary_validate_accepts_good_config() {
    let dir = temp_dir("binary_validate_accepts_good_config");
    let config = write_config(
        &dir,
        r#"
        scenario = "~/cases"
        [[env]]
        id = "instance1"
        host = "10.0.0.1"
        user = "qa"
        "#,
    );

    let output = bootstrap_bin()
        .arg("validate")
        .arg(&config)
        .output()
        .expect("Failed to run qa-bootstrap");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("instance1"));
}

#[test]
fn test_binary_unreachable_package_exits_with_distinct_status() {
    let dir = temp_dir("binary_unreachable_package_exits_with_distinct_status");
    let missing = dir.join("CUBRID-9.3.0.1234-64bit.sh");
    let config = write_config(
        &dir,
        &format!(
            r#"
            scenario = "~/cases"
            package_url = "file://{}"
            [[env]]
            id = "instance1"
            host = "10.0.0.1"
            user = "qa"
            "#,
            missing.display()
        ),
    );

    let output = bootstrap_bin()
        .arg("check")
        .arg(&config)
        .output()
        .expect("Failed to run qa-bootstrap");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("url is available"));
}

#[test]
fn test_binary_check_prints_json_descriptor() {
    let dir = temp_dir("binary_check_prints_json_descriptor");
    let package = dir.join("CUBRID-10.2.0.8797-2d53d29-Linux.x86_64.sh");
    fs::write(&package, "#!/bin/sh\n").unwrap();
    let config = write_config(
        &dir,
        &format!(
            r#"
            scenario = "~/cases"
            package_url = "file://{}"
            [[env]]
            id = "instance1"
            host = "10.0.0.1"
            user = "qa"
            "#,
            package.display()
        ),
    );

    let output = bootstrap_bin()
        .arg("check")
        .arg("--json")
        .arg(&config)
        .output()
        .expect("Failed to run qa-bootstrap");

    assert!(output.status.success());
    let build: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(build["id"], "10.2.0.8797-2d53d29");
    assert_eq!(build["bits"], "64");
    assert_eq!(build["scheme"], "new");
    assert_eq!(build["reinstall"], true);
}
