//! Output parsers turning raw discovery command text into neighbor entries.
//!
//! The collector only ever selects a parser by id; all vendor knowledge lives
//! behind the [`OutputParser`] trait. A handful of common formats are built
//! in and registered by [`ParserRegistry::with_builtin`].

mod cisco;
mod eos;
mod junos;
mod lldpctl;
mod registry;

pub use cisco::{CdpDetailParser, CiscoLldpDetailParser};
pub use eos::EosLldpJsonParser;
pub use junos::JunosLldpJsonParser;
pub use lldpctl::LldpctlKeyValueParser;
pub use registry::ParserRegistry;

use crate::error::ParseError;

/// Ids of the built-in parsers.
pub mod ids {
    /// `lldpctl -f keyvalue`
    pub const LLDPCTL_KEYVALUE: &str = "lldpctl_keyvalue";
    /// Arista `show lldp neighbors detail | json`
    pub const EOS_LLDP_JSON: &str = "eos_lldp_json";
    /// Junos `show lldp neighbors | display json`
    pub const JUNOS_LLDP_JSON: &str = "junos_lldp_json";
    /// IOS / IOS-XE / NX-OS `show lldp neighbors detail`
    pub const CISCO_LLDP_DETAIL: &str = "cisco_lldp_detail";
    /// IOS / IOS-XE / NX-OS `show cdp neighbors detail`
    pub const CISCO_CDP_DETAIL: &str = "cisco_cdp_detail";
}

/// One adjacency as reported by the queried device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborEntry {
    /// Port on the queried device.
    pub local_port: String,

    /// Port on the neighbor.
    pub remote_port: String,

    /// System name the neighbor advertises.
    pub remote_name: String,

    /// Management addresses the neighbor advertises.
    pub remote_mgmt_ips: Vec<String>,

    /// Free-form system description, if advertised.
    pub remote_description: Option<String>,

    /// Platform or model string, if advertised.
    pub remote_platform: Option<String>,
}

impl NeighborEntry {
    /// Create an entry with the two fields every parser can fill.
    pub fn new(local_port: impl Into<String>, remote_name: impl Into<String>) -> Self {
        Self {
            local_port: local_port.into(),
            remote_name: remote_name.into(),
            ..Default::default()
        }
    }

    /// Set the remote port.
    pub fn with_remote_port(mut self, port: impl Into<String>) -> Self {
        self.remote_port = port.into();
        self
    }

    /// Add a management address.
    pub fn with_mgmt_ip(mut self, ip: impl Into<String>) -> Self {
        self.remote_mgmt_ips.push(ip.into());
        self
    }

    /// Whether the entry carries anything that could identify the neighbor.
    pub fn has_identity(&self) -> bool {
        !self.remote_name.trim().is_empty() || !self.remote_mgmt_ips.is_empty()
    }
}

/// Structured result of parsing one host's discovery output.
///
/// Zero entries is a legitimate success: a quiet device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    /// Key of the device that was queried.
    pub local_device_key: String,

    /// Adjacencies, in output order.
    pub entries: Vec<NeighborEntry>,

    /// Addresses the queried device reported for itself.
    ///
    /// Only filled when the output carries a local chassis section (lldpd
    /// `local-chassis.*` keys). Otherwise the inventory's `router_id` and
    /// `mgmt_ip` settings are the sole identity IPs.
    pub identity_hint_ips: Vec<String>,

    /// Non-fatal oddities found while parsing.
    pub warnings: Vec<String>,
}

impl ParseResult {
    /// Create an empty result for a device.
    pub fn new(local_device_key: impl Into<String>) -> Self {
        Self {
            local_device_key: local_device_key.into(),
            ..Default::default()
        }
    }
}

/// Trait for vendor output parsers.
pub trait OutputParser: Send + Sync {
    /// Id this parser is registered under.
    fn id(&self) -> &str;

    /// Parse raw stdout of a discovery command run on `device_key`.
    fn parse(&self, device_key: &str, raw: &str) -> Result<ParseResult, ParseError>;
}

/// Drop obviously empty placeholder values devices print for unset fields.
pub(crate) fn clean_field(value: &str) -> Option<String> {
    let value = value.trim().trim_matches('"').trim();
    match value {
        "" | "-" | "--" | "n/a" | "N/A" | "not advertised" | "Not Advertised" => None,
        _ => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_field() {
        assert_eq!(clean_field("  spine01 "), Some("spine01".to_string()));
        assert_eq!(clean_field("\"Ethernet1\""), Some("Ethernet1".to_string()));
        assert_eq!(clean_field("not advertised"), None);
        assert_eq!(clean_field(" "), None);
    }

    #[test]
    fn test_neighbor_identity() {
        assert!(NeighborEntry::new("eth0", "spine01").has_identity());
        assert!(NeighborEntry::new("eth0", "").with_mgmt_ip("10.0.0.1").has_identity());
        assert!(!NeighborEntry::new("eth0", "  ").has_identity());
    }
}
