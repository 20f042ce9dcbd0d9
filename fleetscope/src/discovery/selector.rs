//! Registry of discovery chains keyed by device-OS id.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use super::chain::DiscoveryChain;
use super::spec::{CommandSpec, ProtocolPreference};
use super::vendors;
use crate::error::{ConfigError, Result};

/// Chooses the ordered command list for a device OS.
///
/// An empty selection means discovery is impossible for that host; callers
/// must never read it as "zero neighbors".
#[derive(Debug, Default, Clone)]
pub struct CommandSelector {
    /// Chains by canonical id and every alias.
    chains: HashMap<String, Arc<DiscoveryChain>>,
}

impl CommandSelector {
    /// Create an empty selector.
    pub fn new() -> Self {
        Self {
            chains: HashMap::new(),
        }
    }

    /// Create a selector with the built-in vendor chains registered.
    pub fn with_builtin() -> Self {
        let mut selector = Self::new();
        selector.register_builtin_chains();
        selector
    }

    fn register_builtin_chains(&mut self) {
        for chain in [
            vendors::linux::chain(),
            vendors::arista::chain(),
            vendors::cisco::chain(),
            vendors::cisco::nxos_chain(),
            vendors::juniper::chain(),
        ] {
            let chain = Arc::new(chain);
            for id in chain.ids() {
                self.chains.insert(id.to_lowercase(), chain.clone());
            }
        }
    }

    /// Register a chain under its OS id and aliases.
    ///
    /// Fails without modifying the registry if any of the ids is taken.
    pub fn register(&mut self, chain: DiscoveryChain) -> Result<()> {
        if let Some(taken) = chain
            .ids()
            .find(|id| self.chains.contains_key(&id.to_lowercase()))
        {
            return Err(ConfigError::AlreadyRegistered {
                name: taken.clone(),
            }
            .into());
        }
        let chain = Arc::new(chain);
        for id in chain.ids() {
            self.chains.insert(id.to_lowercase(), chain.clone());
        }
        Ok(())
    }

    /// Ordered specs for `os` under `preference`.
    ///
    /// Returns an empty list when the OS is unknown, or when the preference
    /// forces a protocol the OS chain does not offer.
    pub fn select(&self, os: &str, preference: ProtocolPreference) -> Vec<CommandSpec> {
        let key = os.trim().to_lowercase();
        let Some(chain) = self.chains.get(&key) else {
            debug!("no discovery chain for device os {:?}", key);
            return vec![];
        };
        chain.filtered(preference)
    }

    /// Get the chain for an OS id.
    pub fn get(&self, os: &str) -> Option<&DiscoveryChain> {
        self.chains.get(&os.trim().to_lowercase()).map(Arc::as_ref)
    }

    /// Check if an OS id is known.
    pub fn contains(&self, os: &str) -> bool {
        self.chains.contains_key(&os.trim().to_lowercase())
    }

    /// List all known OS ids, sorted.
    pub fn os_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.chains.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::spec::DiscoveryProtocol;

    #[test]
    fn test_unknown_os_is_empty() {
        let selector = CommandSelector::with_builtin();
        assert!(selector.select("vxworks", ProtocolPreference::Auto).is_empty());
        assert!(selector.select("", ProtocolPreference::Auto).is_empty());
    }

    #[test]
    fn test_auto_returns_full_chain() {
        let selector = CommandSelector::with_builtin();
        let specs = selector.select("cisco_iosxe", ProtocolPreference::Auto);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].protocol, DiscoveryProtocol::Lldp);
        assert_eq!(specs[1].protocol, DiscoveryProtocol::Cdp);
    }

    #[test]
    fn test_alias_and_case_insensitive() {
        let selector = CommandSelector::with_builtin();
        assert_eq!(
            selector.select(" EOS ", ProtocolPreference::Auto),
            selector.select("arista_eos", ProtocolPreference::Auto)
        );
        assert!(selector.contains("NXOS"));
    }

    #[test]
    fn test_forced_lldp_never_yields_cdp() {
        let selector = CommandSelector::with_builtin();
        for os in selector.os_ids() {
            let specs = selector.select(os, ProtocolPreference::Lldp);
            assert!(specs.iter().all(|s| s.protocol == DiscoveryProtocol::Lldp));
        }
    }

    #[test]
    fn test_forced_cdp_without_cdp_support_is_empty() {
        let selector = CommandSelector::with_builtin();
        assert!(selector.select("arista_eos", ProtocolPreference::Cdp).is_empty());
        assert!(selector.select("linux", ProtocolPreference::Cdp).is_empty());
    }

    #[test]
    fn test_register_custom_chain() {
        let mut selector = CommandSelector::with_builtin();
        let chain = DiscoveryChain::new("mikrotik_routeros").with_spec(CommandSpec::new(
            "neighbors",
            "/ip neighbor print detail",
            "routeros_neighbor",
            DiscoveryProtocol::Lldp,
        ));
        selector.register(chain).unwrap();
        assert_eq!(
            selector.select("mikrotik_routeros", ProtocolPreference::Auto).len(),
            1
        );
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut selector = CommandSelector::with_builtin();
        let err = selector
            .register(DiscoveryChain::new("custom").with_alias("junos"))
            .unwrap_err();
        assert!(err.to_string().contains("junos"));
        assert!(!selector.contains("custom"));
    }
}
