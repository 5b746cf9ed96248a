//! Remote channel over the system OpenSSH client
//!
//! Each session is an OpenSSH control master: `open` authenticates once and
//! leaves a background master on a control socket, `execute` multiplexes a
//! `sh -s` over it, `close` asks the master to exit.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{RemoteChannel, Session};
use crate::common::config::Environment;
use crate::common::{paths, Error, Result};

/// Channel that reaches environments with `ssh`
pub struct SshChannel {
    connect_timeout_secs: u64,
}

impl SshChannel {
    pub fn new(connect_timeout_secs: u64) -> Self {
        Self {
            connect_timeout_secs,
        }
    }
}

#[async_trait]
impl RemoteChannel for SshChannel {
    async fn open(&self, env: &Environment) -> Result<Box<dyn Session>> {
        let ssh = which::which("ssh").map_err(|_| Error::session_open(&env.id, "'ssh' not found in PATH"))?;

        let socket_dir = paths::control_socket_dir();
        paths::ensure_dir(&socket_dir).map_err(|e| Error::session_open(&env.id, e))?;
        let socket = socket_dir.join(control_socket_name(&env.id, std::process::id()));

        let mut cmd = Command::new(&ssh);
        cmd.arg("-M")
            .arg("-S")
            .arg(&socket)
            .arg("-fN")
            .args(["-o", "BatchMode=yes"])
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout_secs));
        target_args(&mut cmd, env);

        tracing::debug!(env = %env.id, "Starting ssh control master at {}", socket.display());

        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::session_open(&env.id, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::session_open(&env.id, stderr.trim()));
        }

        Ok(Box::new(SshSession {
            ssh,
            env: env.clone(),
            socket,
            closed: false,
        }))
    }
}

/// Longest environment id kept in a socket name; `sun_path` is ~104 bytes
const SOCKET_ID_MAX: usize = 32;

/// File name of the control socket for one environment of this process
///
/// The id is opaque, so anything outside `[A-Za-z0-9_-]` becomes `_`.
fn control_socket_name(env_id: &str, pid: u32) -> String {
    let id: String = env_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(SOCKET_ID_MAX)
        .collect();
    format!("{id}-{pid}.sock")
}

fn target_args(cmd: &mut Command, env: &Environment) {
    cmd.arg("-p").arg(env.port.to_string());
    if let Some(key) = &env.identity_file {
        cmd.arg("-i").arg(key);
    }
    cmd.arg(format!("{}@{}", env.user, env.host));
}

/// One control-master connection to an environment
struct SshSession {
    ssh: PathBuf,
    env: Environment,
    socket: PathBuf,
    closed: bool,
}

#[async_trait]
impl Session for SshSession {
    fn host(&self) -> String {
        self.env.to_string()
    }

    async fn execute(&mut self, script: &str) -> Result<String> {
        if self.closed {
            return Err(Error::transport(&self.host(), "session already closed"));
        }

        tracing::trace!(host = %self.env, "Executing: {}", script);

        let mut cmd = Command::new(&self.ssh);
        cmd.arg("-S").arg(&self.socket);
        target_args(&mut cmd, &self.env);
        cmd.args(["sh", "-s"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| Error::transport(&self.host(), e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::transport(&self.host(), "failed to get ssh stdin"))?;
        stdin
            .write_all(script.as_bytes())
            .await
            .map_err(|e| Error::transport(&self.host(), e))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| Error::transport(&self.host(), e))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::transport(&self.host(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::transport(
                &self.host(),
                format!("exit status {:?}: {}", output.status.code(), stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut cmd = Command::new(&self.ssh);
        cmd.arg("-S").arg(&self.socket).args(["-O", "exit"]);
        target_args(&mut cmd, &self.env);

        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::transport(&self.host(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::transport(&self.host(), stderr.trim()));
        }
        Ok(())
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(
                host = %self.env,
                "Session dropped without close; control master at {} left running",
                self.socket.display()
            );
        }
    }
}
