//! Remote command execution.
//!
//! The collector treats remote execution as a black box with a deadline:
//! hand it a host and a command line, get back stdout, stderr and the exit
//! status. Two implementations are provided:
//!
//! - [`SshExecutor`] speaks SSH in-process via russh and runs the command
//!   on an exec channel.
//! - [`OpenSshExecutor`] spawns the system `ssh` binary, so the operator's
//!   own `~/.ssh/config`, agent and jump hosts apply.

pub mod config;
mod openssh;
mod ssh;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ExecError;
use crate::inventory::HostRecord;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use openssh::OpenSshExecutor;
pub use ssh::{SshExecutor, SshExecutorBuilder};

/// Captured result of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// Remote exit status; `None` if the server never reported one.
    pub exit_status: Option<u32>,
    pub elapsed: Duration,
}

impl ExecOutput {
    /// True unless the command reported a non-zero exit status.
    pub fn is_success(&self) -> bool {
        matches!(self.exit_status, None | Some(0))
    }
}

/// Runs a command on a remote host.
///
/// Implementations must be drop-safe: when the returned future is dropped
/// (timeout or cancellation) the remote process or channel is torn down.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run `command` on `host`, giving up after `timeout` or when `cancel`
    /// fires.
    async fn exec(
        &self,
        host: &HostRecord,
        command: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, ExecError>;
}

/// Drive `fut` to completion unless `cancel` fires or `timeout` elapses.
///
/// Cancellation is checked first so an already-cancelled token never starts
/// the work. Either way `fut` is dropped, which aborts whatever it owns.
pub async fn bounded<T, F>(
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, ExecError>
where
    F: Future<Output = Result<T, ExecError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExecError::Cancelled),
        result = tokio::time::timeout(timeout, fut) => match result {
            Ok(inner) => inner,
            Err(_) => Err(ExecError::Timeout(timeout)),
        },
    }
}
