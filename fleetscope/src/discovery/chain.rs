//! Per-OS discovery chain definition.

use super::spec::{CommandSpec, ProtocolPreference};

/// Ordered fallback chain of discovery commands for one device OS.
///
/// Mirrors how a device is probed by hand: the richest command first, older
/// or coarser commands after it.
#[derive(Debug, Clone)]
pub struct DiscoveryChain {
    /// Canonical OS id (e.g., "arista_eos").
    pub os: String,

    /// Additional OS ids that resolve to this chain.
    pub aliases: Vec<String>,

    /// Commands in priority order.
    pub specs: Vec<CommandSpec>,
}

impl DiscoveryChain {
    /// Create an empty chain for an OS id.
    pub fn new(os: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            aliases: vec![],
            specs: vec![],
        }
    }

    /// Add an alias OS id.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Append a command to the end of the chain.
    pub fn with_spec(mut self, spec: CommandSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Specs allowed under `preference`, in chain order.
    pub fn filtered(&self, preference: ProtocolPreference) -> Vec<CommandSpec> {
        self.specs
            .iter()
            .filter(|spec| preference.allows(spec.protocol))
            .cloned()
            .collect()
    }

    /// All ids (canonical first) this chain answers to.
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.os).chain(self.aliases.iter())
    }
}
