//! Scripted fakes for executor and collector tests.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::discovery::{
    CollectFailure, CollectOutcome, CollectSuccess, CommandSpec, DiscoveryProtocol, HostCollector,
};
use crate::error::ExecError;
use crate::exec::{ExecOutput, RemoteExecutor};
use crate::inventory::HostRecord;
use crate::parser::ParseResult;

/// What the fake executor does for one (host, command) pair.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Exit 0 with this stdout.
    Stdout(String),
    /// Exit with a status and stderr.
    Exit(u32, String),
    /// Fail before any output.
    Fail(String),
    /// Never finish.
    Hang,
}

/// Executor that answers from a script and logs every call.
#[derive(Default)]
pub(crate) struct FakeExecutor {
    replies: HashMap<(String, String), Reply>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, host: &str, command: &str, reply: Reply) -> Self {
        self.replies
            .insert((host.to_string(), command.to_string()), reply);
        self
    }

    /// Commands run so far, as (host key, command).
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands_for(&self, host: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(h, _)| h == host)
            .map(|(_, c)| c)
            .collect()
    }
}

#[async_trait]
impl RemoteExecutor for FakeExecutor {
    async fn exec(
        &self,
        host: &HostRecord,
        command: &str,
        _timeout: Duration,
        _cancel: &CancellationToken,
    ) -> Result<ExecOutput, ExecError> {
        self.calls
            .lock()
            .unwrap()
            .push((host.host_key.clone(), command.to_string()));
        let reply = self
            .replies
            .get(&(host.host_key.clone(), command.to_string()))
            .cloned()
            .unwrap_or_else(|| Reply::Fail("no scripted reply".to_string()));
        match reply {
            Reply::Stdout(stdout) => Ok(ExecOutput {
                stdout,
                exit_status: Some(0),
                ..Default::default()
            }),
            Reply::Exit(status, stderr) => Ok(ExecOutput {
                stderr,
                exit_status: Some(status),
                ..Default::default()
            }),
            Reply::Fail(message) => Err(ExecError::Io(io::Error::other(message))),
            Reply::Hang => std::future::pending().await,
        }
    }
}

pub(crate) fn success_for(host: &HostRecord) -> CollectSuccess {
    CollectSuccess {
        host: host.clone(),
        spec_used: CommandSpec::new("fake", "fake", "fake", DiscoveryProtocol::Lldp),
        parse_result: ParseResult::new(host.host_key.clone()),
        stdout: String::new(),
        stderr: String::new(),
        elapsed: Duration::ZERO,
    }
}

/// Collector that sleeps, records concurrency and never touches the network.
#[derive(Default)]
pub(crate) struct CountingCollector {
    delay: Duration,
    /// Hosts that block until cancelled.
    stalled: HashSet<String>,
    failing: HashSet<String>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    started: Mutex<Vec<String>>,
}

impl CountingCollector {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn stall(mut self, host: &str) -> Self {
        self.stalled.insert(host.to_string());
        self
    }

    pub fn fail(mut self, host: &str) -> Self {
        self.failing.insert(host.to_string());
        self
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostCollector for CountingCollector {
    async fn collect(&self, host: &HostRecord, cancel: &CancellationToken) -> CollectOutcome {
        self.started.lock().unwrap().push(host.host_key.clone());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let outcome = if self.stalled.contains(&host.host_key) {
            cancel.cancelled().await;
            CollectOutcome::Cancelled { host: host.clone() }
        } else {
            tokio::time::sleep(self.delay).await;
            if self.failing.contains(&host.host_key) {
                CollectOutcome::Failure(CollectFailure::without_attempts(
                    host.clone(),
                    "scripted failure",
                ))
            } else {
                CollectOutcome::Success(success_for(host))
            }
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

pub(crate) fn hosts(keys: &[&str]) -> Vec<HostRecord> {
    keys.iter()
        .map(|key| HostRecord::new(*key).with_device_os("linux"))
        .collect()
}
