//! Executor that shells out to the system `ssh` binary.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, trace};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::{ExecOutput, RemoteExecutor, bounded};
use crate::error::ExecError;
use crate::inventory::HostRecord;

/// Runs commands through OpenSSH, so `~/.ssh/config`, the agent and jump
/// hosts all apply.
///
/// The child is spawned with `kill_on_drop`, so a timed out or cancelled
/// attempt kills the local `ssh` process and with it the remote session.
#[derive(Debug, Clone)]
pub struct OpenSshExecutor {
    program: PathBuf,
    extra_args: Vec<String>,
    connect_timeout: Duration,
}

impl OpenSshExecutor {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ssh"),
            extra_args: Vec::new(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Use a different `ssh` binary.
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Add an argument passed to every invocation, before per-host ones.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Set `ConnectTimeout` (default: 10s, rounded up to whole seconds).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Full argument list for running `command` on `host`.
    pub fn args_for(&self, host: &HostRecord, command: &str) -> Vec<String> {
        let connect_secs = self.connect_timeout.as_secs_f64().ceil().max(1.0) as u64;
        let mut args = vec![
            "-T".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={connect_secs}"),
        ];
        if let Some(port) = host.ssh.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(user) = &host.ssh.user {
            args.push("-l".to_string());
            args.push(user.clone());
        }
        if let Some(identity) = &host.ssh.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args.extend(host.ssh.extra_args.iter().cloned());
        args.push(host.connect_host().to_string());
        args.push(command.to_string());
        args
    }

    async fn run(&self, args: Vec<String>) -> Result<ExecOutput, ExecError> {
        let started = Instant::now();
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = child.wait_with_output().await?;
        // No exit code means the ssh process itself died from a signal
        let status = output.status.code().ok_or(ExecError::Terminated)?;

        trace!(
            "ssh exited {}: {} bytes stdout, {} bytes stderr",
            status,
            output.stdout.len(),
            output.stderr.len()
        );

        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_status: Some(status as u32),
            elapsed: started.elapsed(),
        })
    }
}

impl Default for OpenSshExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteExecutor for OpenSshExecutor {
    async fn exec(
        &self,
        host: &HostRecord,
        command: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, ExecError> {
        let args = self.args_for(host, command);
        debug!("{}: {} {:?}", host.host_key, self.program.display(), args);
        bounded(timeout, cancel, self.run(args)).await
    }
}
