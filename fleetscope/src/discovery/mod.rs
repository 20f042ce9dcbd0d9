//! Neighbor discovery: choosing commands, collecting hosts, running fleets.
//!
//! - [`CommandSelector`] maps a device OS to its ordered fallback chain.
//! - [`Collector`] walks one host's chain until a command parses.
//! - [`FleetEngine`] runs collectors across many hosts with bounded
//!   concurrency and cooperative cancellation.

pub mod chain;
pub mod collector;
pub mod fleet;
pub mod result;
pub mod selector;
pub mod spec;
pub mod vendors;

pub use chain::DiscoveryChain;
pub use collector::{
    AttemptEvent, CollectState, Collector, DEFAULT_ATTEMPT_TIMEOUT, HostCollector,
};
pub use fleet::{DEFAULT_CONCURRENCY, FleetEngine, FleetEngineBuilder};
pub use result::{Attempt, CollectFailure, CollectOutcome, CollectSuccess, FleetOutcome};
pub use selector::CommandSelector;
pub use spec::{CommandSpec, DiscoveryProtocol, ProtocolPreference};
