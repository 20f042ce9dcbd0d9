//! Fleet-wide collection under bounded concurrency.
//!
//! A fixed set of worker tasks pulls hosts from a shared queue. Completions
//! go over an mpsc channel to the single owner that builds the
//! [`FleetOutcome`]; workers never touch the outcome directly.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::collector::{Collector, DEFAULT_ATTEMPT_TIMEOUT, HostCollector};
use super::result::{CollectOutcome, FleetOutcome};
use super::selector::CommandSelector;
use crate::error::{ConfigError, Result};
use crate::exec::RemoteExecutor;
use crate::inventory::HostRecord;
use crate::parser::ParserRegistry;

/// Hosts collected at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Runs a [`HostCollector`] across many hosts.
#[derive(Clone)]
pub struct FleetEngine {
    collector: Arc<dyn HostCollector>,
    concurrency: usize,
}

impl FleetEngine {
    /// Create an engine; `concurrency` must be at least 1.
    pub fn new(collector: Arc<dyn HostCollector>, concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "Concurrency must be at least 1".to_string(),
            }
            .into());
        }
        Ok(Self {
            collector,
            concurrency,
        })
    }

    pub fn builder() -> FleetEngineBuilder {
        FleetEngineBuilder::new()
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Collect every target, at most `min(concurrency, targets.len())` at a
    /// time.
    ///
    /// Cancelling `cancel` interrupts in-flight hosts and keeps queued hosts
    /// from starting; whatever finished is still returned. De-duplicating
    /// targets is up to the caller.
    pub async fn run(&self, targets: Vec<HostRecord>, cancel: &CancellationToken) -> FleetOutcome {
        let total = targets.len();
        let workers = self.concurrency.min(total);
        let started = Instant::now();
        info!("discovering {} hosts with {} workers", total, workers);

        let queue = Arc::new(Mutex::new(VecDeque::from(targets)));
        let (tx, mut rx) = mpsc::channel::<CollectOutcome>(workers.max(1));

        let mut set = JoinSet::new();
        for worker in 0..workers {
            let queue = queue.clone();
            let tx = tx.clone();
            let collector = self.collector.clone();
            let cancel = cancel.clone();
            set.spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let Some(host) = queue.lock().await.pop_front() else {
                        break;
                    };
                    let outcome = collector.collect(&host, &cancel).await;
                    if tx.send(outcome).await.is_err() {
                        break;
                    }
                }
                debug!("discovery worker {} finished", worker);
            });
        }
        drop(tx);

        let mut outcome = FleetOutcome::default();
        while let Some(done) = rx.recv().await {
            match done {
                CollectOutcome::Success(success) => outcome.successes.push(success),
                CollectOutcome::Failure(failure) => {
                    warn!("{}: {}", failure.host.host_key, failure.summary);
                    outcome.failures.push(failure);
                }
                CollectOutcome::Cancelled { host } => outcome.unfinished.push(host.host_key),
            }
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!("discovery worker aborted: {}", e);
            }
        }

        // Hosts no worker picked up before cancellation
        outcome
            .unfinished
            .extend(queue.lock().await.drain(..).map(|host| host.host_key));
        outcome.cancelled = cancel.is_cancelled();

        info!(
            "discovery finished in {:?}: {} succeeded, {} failed, {} unfinished",
            started.elapsed(),
            outcome.successes.len(),
            outcome.failures.len(),
            outcome.unfinished.len()
        );
        outcome
    }
}

/// Builder for [`FleetEngine`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use fleetscope::discovery::FleetEngine;
/// use fleetscope::exec::OpenSshExecutor;
///
/// # fn example() -> Result<(), fleetscope::Error> {
/// let engine = FleetEngine::builder()
///     .executor(OpenSshExecutor::new())
///     .concurrency(8)
///     .default_timeout(Duration::from_secs(15))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct FleetEngineBuilder {
    concurrency: usize,
    default_timeout: Duration,
    selector: Option<CommandSelector>,
    parsers: Option<ParserRegistry>,
    executor: Option<Arc<dyn RemoteExecutor>>,
    collector: Option<Arc<dyn HostCollector>>,
}

impl FleetEngineBuilder {
    pub fn new() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            default_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            selector: None,
            parsers: None,
            executor: None,
            collector: None,
        }
    }

    /// Set the number of hosts collected at once (default: 6).
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the attempt timeout for specs without their own (default: 10s).
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Use a custom command selector instead of the built-in chains.
    pub fn selector(mut self, selector: CommandSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Use a custom parser registry instead of the built-in parsers.
    pub fn parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = Some(parsers);
        self
    }

    /// Set the executor that runs discovery commands.
    pub fn executor(mut self, executor: impl RemoteExecutor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Set a shared executor.
    pub fn shared_executor(mut self, executor: Arc<dyn RemoteExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Replace the whole per-host collector. Selector, parsers, executor and
    /// timeout settings are then ignored.
    pub fn collector(mut self, collector: Arc<dyn HostCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn build(self) -> Result<FleetEngine> {
        if let Some(collector) = self.collector {
            return FleetEngine::new(collector, self.concurrency);
        }

        if self.default_timeout.is_zero() {
            return Err(ConfigError::InvalidConfig {
                message: "Default attempt timeout must be non-zero".to_string(),
            }
            .into());
        }
        let executor = self.executor.ok_or_else(|| ConfigError::InvalidConfig {
            message: "An executor or collector is required".to_string(),
        })?;

        let collector = Collector::new(
            Arc::new(self.selector.unwrap_or_else(CommandSelector::with_builtin)),
            Arc::new(self.parsers.unwrap_or_else(ParserRegistry::with_builtin)),
            executor,
        )
        .with_default_timeout(self.default_timeout);

        FleetEngine::new(Arc::new(collector), self.concurrency)
    }
}

impl Default for FleetEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
