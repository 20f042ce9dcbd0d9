//! A discovery session: run collection, keep the last snapshot, render it.
//!
//! # Example
//!
//! ```rust,no_run
//! use fleetscope::discovery::FleetEngine;
//! use fleetscope::exec::OpenSshExecutor;
//! use fleetscope::inventory::Inventory;
//! use fleetscope::session::{RenderMode, TopologySession};
//! use fleetscope::topology::RenderOptions;
//!
//! # async fn example() -> Result<(), fleetscope::Error> {
//! let inventory = Inventory::from_json(r#"[{"host": "leaf01", "os": "arista_eos"}]"#)?;
//! let engine = FleetEngine::builder().executor(OpenSshExecutor::new()).build()?;
//!
//! let mut session = TopologySession::new(engine, Some(inventory));
//! session.trigger_discovery(&["leaf01"]).await?;
//! if let Some(text) = session.render(RenderMode::Edges, &RenderOptions::default()) {
//!     print!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::time::SystemTime;

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::discovery::{FleetEngine, FleetOutcome};
use crate::error::{ConfigError, Result};
use crate::identity::normalize_full;
use crate::inventory::Inventory;
use crate::topology::{
    RenderOptions, TopologyGraph, build_graph, render_edges, render_flat, render_layered,
};

/// Which text view to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Layered,
    Edges,
    Flat,
}

/// Result of one discovery run.
#[derive(Debug, Clone)]
pub struct TopologySnapshot {
    /// Targets in the order they were requested, de-duplicated.
    pub targets: Vec<String>,
    pub graph: TopologyGraph,
    pub outcome: FleetOutcome,
    pub taken_at: SystemTime,
}

impl TopologySnapshot {
    pub fn render(&self, mode: RenderMode, opts: &RenderOptions) -> String {
        match mode {
            RenderMode::Layered => render_layered(&self.graph, opts),
            RenderMode::Edges => render_edges(&self.graph, opts),
            RenderMode::Flat => render_flat(&self.graph, opts),
        }
    }
}

/// Owns the engine, the inventory, and the most recent snapshot.
pub struct TopologySession {
    engine: FleetEngine,
    inventory: Option<Inventory>,
    last: Option<TopologySnapshot>,
    cancel: CancellationToken,
}

impl TopologySession {
    pub fn new(engine: FleetEngine, inventory: Option<Inventory>) -> Self {
        Self {
            engine,
            inventory,
            last: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn inventory(&self) -> Option<&Inventory> {
        self.inventory.as_ref()
    }

    pub fn set_inventory(&mut self, inventory: Inventory) {
        self.inventory = Some(inventory);
    }

    /// Token that cancels the current run, or the next one if fired while
    /// idle.
    ///
    /// A run that ends cancelled installs a fresh token, so fetch the handle
    /// again after each cancellation.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Collect `targets` and replace the last snapshot.
    ///
    /// An empty target list means every inventory host. Host failures and
    /// cancellation are reported inside the snapshot; only a missing
    /// inventory is an error.
    pub async fn trigger_discovery<S: AsRef<str>>(
        &mut self,
        targets: &[S],
    ) -> Result<&TopologySnapshot> {
        let inventory = self
            .inventory
            .as_ref()
            .ok_or(ConfigError::MissingInventory)?;

        let targets: Vec<String> = if targets.is_empty() {
            inventory.hosts().map(|h| h.host_key.clone()).collect()
        } else {
            dedup_targets(targets)
        };

        let hosts = inventory.resolve(&targets);
        let outcome = self.engine.run(hosts, &self.cancel).await;
        if self.cancel.is_cancelled() {
            debug!("run was cancelled, installing a fresh token");
            self.cancel = CancellationToken::new();
        }
        let graph = build_graph(
            Some(inventory),
            &targets,
            &outcome.successes,
            &outcome.failures,
        )?;
        info!(
            "topology snapshot: {} nodes, {} edges, {} warnings",
            graph.nodes.len(),
            graph.edges.len(),
            graph.warnings.len()
        );

        let snapshot = TopologySnapshot {
            targets,
            graph,
            outcome,
            taken_at: SystemTime::now(),
        };
        Ok(&*self.last.insert(snapshot))
    }

    /// Run again over the previous targets, or the whole inventory when
    /// nothing has run yet.
    pub async fn refresh(&mut self) -> Result<&TopologySnapshot> {
        let targets = self
            .last
            .as_ref()
            .map(|s| s.targets.clone())
            .unwrap_or_default();
        self.trigger_discovery(&targets).await
    }

    pub fn last(&self) -> Option<&TopologySnapshot> {
        self.last.as_ref()
    }

    /// Render the last snapshot without collecting again.
    pub fn render(&self, mode: RenderMode, opts: &RenderOptions) -> Option<String> {
        self.last.as_ref().map(|s| s.render(mode, opts))
    }
}

fn dedup_targets<S: AsRef<str>>(targets: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty() && seen.insert(normalize_full(t)))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::error::Error;
    use crate::inventory::HostRecord;
    use crate::test_support::{CountingCollector, FakeExecutor, Reply};

    const LEAF01_LLDP: &str = "\
lldp.eth0.chassis.name=leaf02.lab
lldp.eth0.port.ifname=swp1
";

    fn fleet_inventory() -> Inventory {
        Inventory::from_hosts([
            HostRecord::new("leaf01.lab").with_device_os("linux"),
            HostRecord::new("leaf02.lab").with_device_os("linux"),
            HostRecord::new("fw01").with_device_os("linux"),
        ])
    }

    fn counting_session(collector: CountingCollector) -> TopologySession {
        let engine = FleetEngine::builder()
            .collector(Arc::new(collector))
            .concurrency(2)
            .build()
            .unwrap();
        TopologySession::new(engine, Some(fleet_inventory()))
    }

    #[tokio::test]
    async fn test_missing_inventory_is_an_error() {
        let engine = FleetEngine::builder()
            .collector(Arc::new(CountingCollector::new(Duration::ZERO)))
            .build()
            .unwrap();
        let mut session = TopologySession::new(engine, None);

        let err = session.trigger_discovery(&["leaf01"]).await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingInventory)));
        assert!(session.last().is_none());
        assert!(session.render(RenderMode::Flat, &RenderOptions::default()).is_none());
    }

    #[tokio::test]
    async fn test_discovery_builds_graph_from_neighbors() {
        let executor = FakeExecutor::new().reply(
            "leaf01.lab",
            "lldpctl -f keyvalue",
            Reply::Stdout(LEAF01_LLDP.to_string()),
        );
        let engine = FleetEngine::builder().executor(executor).build().unwrap();
        let mut session = TopologySession::new(engine, Some(fleet_inventory()));

        let snapshot = session
            .trigger_discovery(&["leaf01.lab", "leaf02.lab"])
            .await
            .unwrap();
        assert_eq!(snapshot.outcome.successes.len(), 1);
        assert_eq!(snapshot.outcome.failures.len(), 1);
        assert_eq!(snapshot.graph.edges.len(), 1);

        let edge = &snapshot.graph.edges[0];
        assert_eq!(edge.from, "leaf01.lab");
        assert_eq!(edge.to, "leaf02.lab");
        // leaf02 failed, so it stays an island despite the inbound edge
        assert!(snapshot.graph.node("leaf02.lab").unwrap().is_island);

        let text = session
            .render(RenderMode::Edges, &RenderOptions::default())
            .unwrap();
        assert_eq!(text, "leaf01.lab:eth0 <-> leaf02.lab:swp1\n");
    }

    #[tokio::test]
    async fn test_empty_targets_mean_whole_inventory() {
        let mut session = counting_session(CountingCollector::new(Duration::ZERO));
        let no_targets: [&str; 0] = [];
        let snapshot = session.trigger_discovery(&no_targets).await.unwrap();
        assert_eq!(snapshot.targets, vec!["leaf01.lab", "leaf02.lab", "fw01"]);
        assert_eq!(snapshot.outcome.completed(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_targets_are_collected_once() {
        let mut session = counting_session(CountingCollector::new(Duration::ZERO));
        let snapshot = session
            .trigger_discovery(&["fw01", "FW01.", " fw01 ", ""])
            .await
            .unwrap();
        assert_eq!(snapshot.targets, vec!["fw01"]);
        assert_eq!(snapshot.outcome.completed(), 1);
    }

    #[tokio::test]
    async fn test_refresh_reuses_targets() {
        let mut session = counting_session(CountingCollector::new(Duration::ZERO));
        session.trigger_discovery(&["fw01"]).await.unwrap();
        let first = session.last().unwrap().taken_at;

        let snapshot = session.refresh().await.unwrap();
        assert_eq!(snapshot.targets, vec!["fw01"]);
        assert!(snapshot.taken_at >= first);
    }

    #[tokio::test]
    async fn test_token_fired_while_idle_cancels_next_run() {
        let mut session = counting_session(CountingCollector::new(Duration::ZERO));
        session.cancel_handle().cancel();

        let snapshot = session.trigger_discovery(&["fw01"]).await.unwrap();
        assert!(snapshot.outcome.cancelled);
        assert_eq!(snapshot.outcome.completed(), 0);
        assert_eq!(snapshot.outcome.unfinished, vec!["fw01"]);

        // The fired token was swapped out, so the following run completes
        assert!(!session.cancel_handle().is_cancelled());
        let snapshot = session.trigger_discovery(&["fw01"]).await.unwrap();
        assert!(!snapshot.outcome.cancelled);
        assert_eq!(snapshot.outcome.completed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_run_keeps_partial_snapshot() {
        let collector = CountingCollector::new(Duration::from_millis(10)).stall("leaf02.lab");
        let mut session = counting_session(collector);
        let handle = session.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.cancel();
        });

        let snapshot = session
            .trigger_discovery(&["leaf01.lab", "leaf02.lab"])
            .await
            .unwrap();
        assert!(snapshot.outcome.cancelled);
        assert_eq!(snapshot.outcome.successes.len(), 1);
        assert_eq!(snapshot.outcome.unfinished, vec!["leaf02.lab"]);
        assert_eq!(snapshot.graph.nodes.len(), 2);
    }

    #[test]
    fn test_dedup_targets() {
        assert_eq!(
            dedup_targets(&["a", "B.", "b", " ", "a.lab"]),
            vec!["a", "B.", "a.lab"]
        );
    }
}
