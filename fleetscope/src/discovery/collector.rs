//! Single-host collection: walk a host's fallback chain until one command
//! parses.
//!
//! The first successful parse ends the chain, even with zero neighbors. A
//! quiet device is a valid answer, not a reason to keep probing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, trace};
use tokio_util::sync::CancellationToken;

use super::result::{Attempt, CollectFailure, CollectOutcome, CollectSuccess};
use super::selector::CommandSelector;
use super::spec::CommandSpec;
use crate::error::{ConfigError, ExecError};
use crate::exec::{ExecOutput, RemoteExecutor, bounded};
use crate::inventory::HostRecord;
use crate::parser::ParserRegistry;

/// Attempt timeout used when a spec does not set its own.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Position of a host in its fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectState {
    Pending,
    /// Running the spec at this index.
    Attempting(usize),
    /// The spec at this index parsed.
    Succeeded(usize),
    Exhausted,
}

/// How an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEvent {
    Parsed,
    ExecFailed,
    ParseFailed,
}

impl CollectState {
    /// Advance through a chain of `len` specs.
    ///
    /// `Pending` starts the chain whatever the event; terminal states stay
    /// where they are.
    pub fn step(self, event: AttemptEvent, len: usize) -> Self {
        match self {
            CollectState::Pending if len == 0 => CollectState::Exhausted,
            CollectState::Pending => CollectState::Attempting(0),
            CollectState::Attempting(i) => match event {
                AttemptEvent::Parsed => CollectState::Succeeded(i),
                AttemptEvent::ExecFailed | AttemptEvent::ParseFailed if i + 1 < len => {
                    CollectState::Attempting(i + 1)
                }
                AttemptEvent::ExecFailed | AttemptEvent::ParseFailed => CollectState::Exhausted,
            },
            terminal => terminal,
        }
    }

    /// Initial state for a chain of `len` specs.
    pub fn start(len: usize) -> Self {
        CollectState::Pending.step(AttemptEvent::ExecFailed, len)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CollectState::Succeeded(_) | CollectState::Exhausted)
    }
}

/// Something that can collect one host.
///
/// The fleet engine only talks to this trait, so tests can swap in an
/// instrumented fake.
#[async_trait]
pub trait HostCollector: Send + Sync {
    async fn collect(&self, host: &HostRecord, cancel: &CancellationToken) -> CollectOutcome;
}

/// Runs a host's discovery chain over a [`RemoteExecutor`].
#[derive(Clone)]
pub struct Collector {
    selector: Arc<CommandSelector>,
    parsers: Arc<ParserRegistry>,
    executor: Arc<dyn RemoteExecutor>,
    default_timeout: Duration,
}

impl Collector {
    pub fn new(
        selector: Arc<CommandSelector>,
        parsers: Arc<ParserRegistry>,
        executor: Arc<dyn RemoteExecutor>,
    ) -> Self {
        Self {
            selector,
            parsers,
            executor,
            default_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Set the timeout for specs without their own.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    async fn run_chain(
        &self,
        host: &HostRecord,
        specs: &[CommandSpec],
        cancel: &CancellationToken,
    ) -> CollectOutcome {
        let mut attempts = Vec::new();
        let mut success = None;
        let mut state = CollectState::start(specs.len());

        while let CollectState::Attempting(index) = state {
            if cancel.is_cancelled() {
                debug!("{}: cancelled before {}", host.host_key, specs[index].name);
                return CollectOutcome::Cancelled { host: host.clone() };
            }

            let spec = &specs[index];
            let timeout = spec.timeout.unwrap_or(self.default_timeout);
            let started = Instant::now();
            // The executor gets the deadline too, but it is enforced here so
            // a misbehaving executor cannot stall the host
            let result = bounded(
                timeout,
                cancel,
                self.executor.exec(host, &spec.command, timeout, cancel),
            )
            .await;
            let elapsed = started.elapsed();

            let event = match result {
                Err(ExecError::Cancelled) => {
                    debug!("{}: cancelled during {}", host.host_key, spec.name);
                    return CollectOutcome::Cancelled { host: host.clone() };
                }
                Err(e) => {
                    debug!("{}: {} failed: {}", host.host_key, spec.name, e);
                    attempts.push(Attempt {
                        spec: spec.clone(),
                        stdout: String::new(),
                        stderr: String::new(),
                        exec_error: Some(e.to_string()),
                        parse_error: None,
                        elapsed,
                    });
                    AttemptEvent::ExecFailed
                }
                Ok(output) if !output.is_success() => {
                    let e = ExecError::ExitStatus {
                        status: output.exit_status.unwrap_or_default(),
                        stderr: output.stderr.trim().to_string(),
                    };
                    debug!("{}: {} failed: {}", host.host_key, spec.name, e);
                    attempts.push(Attempt {
                        spec: spec.clone(),
                        stdout: output.stdout,
                        stderr: output.stderr,
                        exec_error: Some(e.to_string()),
                        parse_error: None,
                        elapsed,
                    });
                    AttemptEvent::ExecFailed
                }
                Ok(output) => {
                    trace!(
                        "{}: {} returned {} bytes",
                        host.host_key,
                        spec.name,
                        output.stdout.len()
                    );
                    self.parse_attempt(host, spec, output, elapsed, &mut attempts, &mut success)
                }
            };
            state = state.step(event, specs.len());
        }

        match success {
            Some(success) => CollectOutcome::Success(success),
            None => {
                let failure = CollectFailure::exhausted(host.clone(), attempts);
                debug!("{}: discovery failed: {}", host.host_key, failure.summary);
                CollectOutcome::Failure(failure)
            }
        }
    }

    fn parse_attempt(
        &self,
        host: &HostRecord,
        spec: &CommandSpec,
        output: ExecOutput,
        elapsed: Duration,
        attempts: &mut Vec<Attempt>,
        success: &mut Option<CollectSuccess>,
    ) -> AttemptEvent {
        match self
            .parsers
            .parse(&spec.parser_id, &host.host_key, &output.stdout)
        {
            Ok(parse_result) => {
                debug!(
                    "{}: {} found {} neighbors",
                    host.host_key,
                    spec.name,
                    parse_result.entries.len()
                );
                *success = Some(CollectSuccess {
                    host: host.clone(),
                    spec_used: spec.clone(),
                    parse_result,
                    stdout: output.stdout,
                    stderr: output.stderr,
                    elapsed,
                });
                AttemptEvent::Parsed
            }
            Err(e) => {
                debug!("{}: {} output unusable: {}", host.host_key, spec.name, e);
                attempts.push(Attempt {
                    spec: spec.clone(),
                    stdout: output.stdout,
                    stderr: output.stderr,
                    exec_error: None,
                    parse_error: Some(e.to_string()),
                    elapsed,
                });
                AttemptEvent::ParseFailed
            }
        }
    }
}

#[async_trait]
impl HostCollector for Collector {
    async fn collect(&self, host: &HostRecord, cancel: &CancellationToken) -> CollectOutcome {
        let Some(os) = host.os() else {
            let error = ConfigError::MissingDeviceOs {
                host: host.host_key.clone(),
            };
            return CollectOutcome::Failure(CollectFailure::without_attempts(
                host.clone(),
                error.to_string(),
            ));
        };

        let preference = host.protocol_preference();
        let specs = self.selector.select(os, preference);
        if specs.is_empty() {
            return CollectOutcome::Failure(CollectFailure::without_attempts(
                host.clone(),
                format!("no discovery commands for device os '{os}' (protocol {preference})"),
            ));
        }

        self.run_chain(host, &specs, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ProtocolPreference;
    use crate::inventory::DiscoverySettings;
    use crate::test_support::{FakeExecutor, Reply};

    const LLDPCTL: &str = "lldpctl -f keyvalue";
    const LLDPCTL_SUDO: &str = "sudo -n lldpctl -f keyvalue";
    const IOS_LLDP: &str = "show lldp neighbors detail";
    const IOS_CDP: &str = "show cdp neighbors detail";

    fn collector(executor: Arc<FakeExecutor>) -> Collector {
        Collector::new(
            Arc::new(CommandSelector::with_builtin()),
            Arc::new(ParserRegistry::with_builtin()),
            executor,
        )
    }

    fn expect_success(outcome: CollectOutcome) -> CollectSuccess {
        match outcome {
            CollectOutcome::Success(s) => s,
            other => panic!("expected success, got {other:?}"),
        }
    }

    fn expect_failure(outcome: CollectOutcome) -> CollectFailure {
        match outcome {
            CollectOutcome::Failure(f) => f,
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_state_machine() {
        assert_eq!(CollectState::start(0), CollectState::Exhausted);
        let state = CollectState::start(2);
        assert_eq!(state, CollectState::Attempting(0));

        let state = state.step(AttemptEvent::ExecFailed, 2);
        assert_eq!(state, CollectState::Attempting(1));
        assert_eq!(
            state.step(AttemptEvent::Parsed, 2),
            CollectState::Succeeded(1)
        );
        assert_eq!(
            state.step(AttemptEvent::ParseFailed, 2),
            CollectState::Exhausted
        );
        assert_eq!(
            CollectState::Exhausted.step(AttemptEvent::Parsed, 2),
            CollectState::Exhausted
        );
        assert!(CollectState::Succeeded(0).is_terminal());
        assert!(!CollectState::Attempting(0).is_terminal());
    }

    #[tokio::test]
    async fn test_unknown_os_has_no_attempts() {
        let executor = Arc::new(FakeExecutor::new());
        let host = HostRecord::new("fw01").with_device_os("vxworks");
        let failure = expect_failure(
            collector(executor.clone())
                .collect(&host, &CancellationToken::new())
                .await,
        );
        assert!(failure.attempts.is_empty());
        assert_eq!(
            failure.summary,
            "no discovery commands for device os 'vxworks' (protocol auto)"
        );
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_os_has_no_attempts() {
        let executor = Arc::new(FakeExecutor::new());
        let failure = expect_failure(
            collector(executor.clone())
                .collect(&HostRecord::new("fw01"), &CancellationToken::new())
                .await,
        );
        assert!(failure.attempts.is_empty());
        assert!(failure.summary.contains("no device OS"));
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_zero_neighbors_stops_the_chain() {
        let executor =
            Arc::new(FakeExecutor::new().reply("srv01", LLDPCTL, Reply::Stdout(String::new())));
        let host = HostRecord::new("srv01").with_device_os("linux");
        let success = expect_success(
            collector(executor.clone())
                .collect(&host, &CancellationToken::new())
                .await,
        );
        assert!(success.parse_result.entries.is_empty());
        assert_eq!(success.spec_used.command, LLDPCTL);
        assert_eq!(executor.commands_for("srv01"), vec![LLDPCTL]);
    }

    #[tokio::test]
    async fn test_falls_back_after_exit_status() {
        let executor = Arc::new(
            FakeExecutor::new()
                .reply(
                    "srv01",
                    LLDPCTL,
                    Reply::Exit(1, "unable to connect to lldpd daemon".to_string()),
                )
                .reply(
                    "srv01",
                    LLDPCTL_SUDO,
                    Reply::Stdout("lldp.eth0.rid=1\nlldp.eth0.chassis.name=tor01\n".to_string()),
                ),
        );
        let host = HostRecord::new("srv01").with_device_os("linux");
        let success = expect_success(
            collector(executor.clone())
                .collect(&host, &CancellationToken::new())
                .await,
        );
        assert_eq!(success.spec_used.command, LLDPCTL_SUDO);
        assert_eq!(success.parse_result.entries[0].remote_name, "tor01");
        assert_eq!(executor.commands_for("srv01"), vec![LLDPCTL, LLDPCTL_SUDO]);
    }

    #[tokio::test]
    async fn test_parse_error_falls_back_to_cdp() {
        let executor = Arc::new(
            FakeExecutor::new()
                .reply(
                    "access01",
                    IOS_LLDP,
                    Reply::Stdout("% LLDP is not enabled\n".to_string()),
                )
                .reply(
                    "access01",
                    IOS_CDP,
                    Reply::Stdout("Total cdp entries displayed : 0\n".to_string()),
                ),
        );
        let host = HostRecord::new("access01").with_device_os("cisco_ios");
        let success = expect_success(
            collector(executor)
                .collect(&host, &CancellationToken::new())
                .await,
        );
        assert_eq!(success.spec_used.name, "cdp-detail");
    }

    #[tokio::test]
    async fn test_forced_lldp_never_runs_cdp() {
        let executor = Arc::new(FakeExecutor::new().reply(
            "access01",
            IOS_LLDP,
            Reply::Stdout("% LLDP is not enabled\n".to_string()),
        ));
        let host = HostRecord::new("access01")
            .with_device_os("cisco_ios")
            .with_discovery(DiscoverySettings {
                protocol: ProtocolPreference::Lldp,
                ..Default::default()
            });
        let failure = expect_failure(
            collector(executor.clone())
                .collect(&host, &CancellationToken::new())
                .await,
        );
        assert_eq!(failure.attempts.len(), 1);
        assert!(failure.attempts[0].parse_error.is_some());
        assert_eq!(executor.commands_for("access01"), vec![IOS_LLDP]);
    }

    #[tokio::test]
    async fn test_exhausted_summary_prefers_exec_error() {
        let executor = Arc::new(
            FakeExecutor::new()
                .reply("access01", IOS_LLDP, Reply::Fail("connection reset".to_string()))
                .reply(
                    "access01",
                    IOS_CDP,
                    Reply::Stdout("% CDP is not enabled\n".to_string()),
                ),
        );
        let host = HostRecord::new("access01").with_device_os("ios");
        let failure = expect_failure(
            collector(executor)
                .collect(&host, &CancellationToken::new())
                .await,
        );
        assert_eq!(failure.attempts.len(), 2);
        assert!(failure.attempts[0].exec_error.is_some());
        assert!(failure.attempts[1].parse_error.is_some());
        assert!(failure.summary.contains("connection reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_per_attempt() {
        let executor = Arc::new(
            FakeExecutor::new()
                .reply("srv01", LLDPCTL, Reply::Hang)
                .reply("srv01", LLDPCTL_SUDO, Reply::Hang),
        );
        let host = HostRecord::new("srv01").with_device_os("linux");
        let failure = expect_failure(
            collector(executor)
                .with_default_timeout(Duration::from_secs(3))
                .collect(&host, &CancellationToken::new())
                .await,
        );
        assert_eq!(failure.attempts.len(), 2);
        for attempt in &failure.attempts {
            assert!(attempt.exec_error.as_deref().unwrap().contains("timed out"));
        }
    }

    #[tokio::test]
    async fn test_cancel_aborts_hung_command() {
        let executor = Arc::new(FakeExecutor::new().reply("srv01", LLDPCTL, Reply::Hang));
        let host = HostRecord::new("srv01").with_device_os("linux");
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let outcome = collector(executor.clone())
            .with_default_timeout(Duration::from_secs(300))
            .collect(&host, &cancel)
            .await;
        assert!(matches!(outcome, CollectOutcome::Cancelled { .. }));
        assert_eq!(executor.commands_for("srv01"), vec![LLDPCTL]);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_spec() {
        let executor = Arc::new(FakeExecutor::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let host = HostRecord::new("srv01").with_device_os("linux");
        let outcome = collector(executor.clone()).collect(&host, &cancel).await;
        assert!(matches!(outcome, CollectOutcome::Cancelled { .. }));
        assert!(executor.calls().is_empty());
    }
}
