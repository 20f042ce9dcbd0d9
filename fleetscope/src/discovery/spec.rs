//! Command specs and protocol preferences.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Neighbor-discovery protocol a command queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryProtocol {
    /// Link Layer Discovery Protocol
    Lldp,
    /// Cisco Discovery Protocol
    Cdp,
}

impl fmt::Display for DiscoveryProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryProtocol::Lldp => f.write_str("lldp"),
            DiscoveryProtocol::Cdp => f.write_str("cdp"),
        }
    }
}

/// Operator preference for which protocol to query.
///
/// A forced preference is a contract: `Lldp` never yields CDP data, even when
/// the device has no LLDP command at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolPreference {
    /// Use the OS's canonical fallback chain
    #[default]
    Auto,
    /// Only LLDP commands
    #[serde(alias = "lldp-only", alias = "lldp_only")]
    Lldp,
    /// Only CDP commands
    #[serde(alias = "cdp-only", alias = "cdp_only")]
    Cdp,
}

impl ProtocolPreference {
    /// Whether a command for `protocol` may run under this preference.
    pub fn allows(&self, protocol: DiscoveryProtocol) -> bool {
        match self {
            ProtocolPreference::Auto => true,
            ProtocolPreference::Lldp => protocol == DiscoveryProtocol::Lldp,
            ProtocolPreference::Cdp => protocol == DiscoveryProtocol::Cdp,
        }
    }
}

impl fmt::Display for ProtocolPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolPreference::Auto => f.write_str("auto"),
            ProtocolPreference::Lldp => f.write_str("lldp"),
            ProtocolPreference::Cdp => f.write_str("cdp"),
        }
    }
}

impl FromStr for ProtocolPreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(ProtocolPreference::Auto),
            "lldp" | "lldp-only" | "lldp_only" => Ok(ProtocolPreference::Lldp),
            "cdp" | "cdp-only" | "cdp_only" => Ok(ProtocolPreference::Cdp),
            other => Err(ConfigError::InvalidConfig {
                message: format!("unknown protocol preference '{other}'"),
            }),
        }
    }
}

/// One discovery command and the parser that understands its output.
///
/// Specs are immutable once built; their order inside a chain is their
/// priority, most capable first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Short label used in diagnostics (e.g., "lldp-json").
    pub name: String,

    /// Remote command line.
    pub command: String,

    /// Id of the parser that handles this command's stdout.
    pub parser_id: String,

    /// Protocol this command queries.
    pub protocol: DiscoveryProtocol,

    /// Per-attempt timeout; the collector default applies when `None`.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    /// Create a spec with no explicit timeout.
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        parser_id: impl Into<String>,
        protocol: DiscoveryProtocol,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            parser_id: parser_id.into(),
            protocol,
            timeout: None,
        }
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.command)
    }
}
