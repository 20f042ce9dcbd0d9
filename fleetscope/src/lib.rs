//! # Fleetscope
//!
//! Fleet-wide LLDP/CDP neighbor discovery over SSH, reconciled against a
//! static inventory and rendered as a text topology.
//!
//! ## Features
//!
//! - Per-OS fallback chains of discovery commands (Linux lldpd, Arista EOS,
//!   Cisco IOS/NX-OS, Juniper Junos), filtered by LLDP/CDP preference
//! - Parsers for lldpctl key-value, EOS and Junos JSON, and Cisco detail text
//! - Bounded-concurrency collection with per-attempt timeouts and cooperative
//!   cancellation
//! - Two executors: in-process russh exec channels or the system `ssh` binary
//! - Identity reconciliation of advertised names and IPs against inventory
//! - Deterministic layered, edge-list and flat renderings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fleetscope::{FleetEngine, Inventory, RenderMode, RenderOptions, SshExecutor, TopologySession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fleetscope::Error> {
//!     let inventory = Inventory::from_json(
//!         r#"[
//!             {"host": "leaf01.lab", "os": "arista_eos"},
//!             {"host": "leaf02.lab", "os": "cisco_nxos"},
//!             {"host": "server01", "os": "linux"}
//!         ]"#,
//!     )?;
//!
//!     let executor = SshExecutor::builder()
//!         .username("netops")
//!         .private_key("/home/netops/.ssh/id_ed25519")
//!         .build()?;
//!     let engine = FleetEngine::builder()
//!         .executor(executor)
//!         .concurrency(8)
//!         .build()?;
//!
//!     let mut session = TopologySession::new(engine, Some(inventory));
//!     let snapshot = session.trigger_discovery(&["leaf01.lab", "leaf02.lab", "server01"]).await?;
//!     println!("{}", snapshot.outcome.failure_report());
//!     print!("{}", snapshot.render(RenderMode::Layered, &RenderOptions::default()));
//!     Ok(())
//! }
//! ```

pub mod discovery;
pub mod error;
pub mod exec;
pub mod identity;
pub mod inventory;
pub mod parser;
pub mod session;
pub mod topology;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use discovery::{
    CollectFailure, CollectOutcome, CollectSuccess, CommandSelector, CommandSpec, FleetEngine,
    FleetEngineBuilder, FleetOutcome, ProtocolPreference,
};
pub use error::{Error, Result};
pub use exec::{AuthMethod, OpenSshExecutor, RemoteExecutor, SshConfig, SshExecutor};
pub use inventory::{HostRecord, Inventory};
pub use parser::{NeighborEntry, OutputParser, ParseResult, ParserRegistry};
pub use session::{RenderMode, TopologySession, TopologySnapshot};
pub use topology::{RenderOptions, TopologyGraph, build_graph};
