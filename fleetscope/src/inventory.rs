//! Inventory types: the configured hosts discovery runs against.
//!
//! Loading and persisting these records belongs to the caller. The types
//! derive `Deserialize` so they can be read from whatever config format the
//! caller uses; [`Inventory::from_json`] covers the common case.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::discovery::ProtocolPreference;
use crate::error::{ConfigError, Result};
use crate::identity::{choose_identity_ips, normalize_full, parse_ip_literal, split_ip_tokens};

/// Per-host SSH connection overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SshOverrides {
    /// Address to connect to when it differs from the host key.
    pub hostname: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<PathBuf>,
    /// Extra arguments passed through to the system `ssh` binary.
    pub extra_args: Vec<String>,
}

/// Persisted per-host discovery settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub router_id: String,
    /// Comma or whitespace separated management addresses.
    pub mgmt_ip: String,
    pub protocol: ProtocolPreference,
}

impl DiscoverySettings {
    /// Management addresses as individual tokens.
    pub fn mgmt_ips(&self) -> Vec<&str> {
        split_ip_tokens(&self.mgmt_ip)
    }
}

/// A configured host.
#[derive(Debug, Clone, Deserialize)]
pub struct HostRecord {
    /// Name the operator knows the host by.
    #[serde(alias = "host")]
    pub host_key: String,

    /// Device-OS id used to pick the discovery chain.
    #[serde(default, alias = "os")]
    pub device_os: Option<String>,

    #[serde(default)]
    pub ssh: SshOverrides,

    #[serde(default)]
    pub discovery: Option<DiscoverySettings>,
}

impl HostRecord {
    pub fn new(host_key: impl Into<String>) -> Self {
        Self {
            host_key: host_key.into(),
            device_os: None,
            ssh: SshOverrides::default(),
            discovery: None,
        }
    }

    pub fn with_device_os(mut self, os: impl Into<String>) -> Self {
        self.device_os = Some(os.into());
        self
    }

    pub fn with_ssh(mut self, ssh: SshOverrides) -> Self {
        self.ssh = ssh;
        self
    }

    pub fn with_discovery(mut self, discovery: DiscoverySettings) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Device-OS id, if one is set and not blank.
    pub fn os(&self) -> Option<&str> {
        self.device_os
            .as_deref()
            .map(str::trim)
            .filter(|os| !os.is_empty())
    }

    /// Address to open the SSH connection to.
    pub fn connect_host(&self) -> &str {
        self.ssh
            .hostname
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(&self.host_key)
    }

    /// Protocol preference from persisted settings, `Auto` when unset.
    pub fn protocol_preference(&self) -> ProtocolPreference {
        self.discovery
            .as_ref()
            .map(|d| d.protocol)
            .unwrap_or_default()
    }

    /// Identity IPs from persisted settings, plus the host key itself when
    /// it is an IP literal.
    pub fn identity_ips(&self) -> Vec<String> {
        let (router_id, mut mgmt) = match &self.discovery {
            Some(d) => (d.router_id.as_str(), d.mgmt_ips()),
            None => ("", Vec::new()),
        };
        if parse_ip_literal(&self.host_key).is_some() {
            mgmt.push(self.host_key.as_str());
        }
        choose_identity_ips(router_id, &mgmt)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InventoryDocument {
    List(Vec<HostRecord>),
    Wrapped { hosts: Vec<HostRecord> },
}

/// Configured hosts keyed by normalized host key.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    hosts: IndexMap<String, HostRecord>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records; a later record with the same normalized key
    /// replaces the earlier one.
    pub fn from_hosts(hosts: impl IntoIterator<Item = HostRecord>) -> Self {
        let mut inventory = Self::new();
        for host in hosts {
            inventory.insert(host);
        }
        inventory
    }

    /// Decode a JSON document, either a bare list of hosts or
    /// `{"hosts": [...]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: InventoryDocument =
            serde_json::from_str(json).map_err(ConfigError::Inventory)?;
        let hosts = match document {
            InventoryDocument::List(hosts) => hosts,
            InventoryDocument::Wrapped { hosts } => hosts,
        };
        Ok(Self::from_hosts(hosts))
    }

    /// Insert a host, returning the record it replaced.
    pub fn insert(&mut self, host: HostRecord) -> Option<HostRecord> {
        self.hosts.insert(normalize_full(&host.host_key), host)
    }

    /// Look up a host by any spelling of its key.
    pub fn get(&self, host_key: &str) -> Option<&HostRecord> {
        self.hosts.get(&normalize_full(host_key))
    }

    pub fn contains(&self, host_key: &str) -> bool {
        self.get(host_key).is_some()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &HostRecord> {
        self.hosts.values()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Records for `targets`, in target order.
    ///
    /// Targets missing from the inventory get a bare record with no device
    /// OS, so their collection fails with a clear summary instead of being
    /// dropped.
    pub fn resolve<S: AsRef<str>>(&self, targets: &[S]) -> Vec<HostRecord> {
        targets
            .iter()
            .map(|target| {
                let target = target.as_ref();
                self.get(target)
                    .cloned()
                    .unwrap_or_else(|| HostRecord::new(target))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_list() {
        let json = r#"[
            {"host_key": "leaf01.lab.local", "device_os": "arista_eos"},
            {"host": "10.0.0.9", "os": "linux", "ssh": {"user": "ops", "port": 2222}}
        ]"#;
        let inventory = Inventory::from_json(json).unwrap();
        assert_eq!(inventory.len(), 2);

        let leaf = inventory.get("LEAF01.lab.local.").unwrap();
        assert_eq!(leaf.os(), Some("arista_eos"));
        assert_eq!(leaf.protocol_preference(), ProtocolPreference::Auto);

        let server = inventory.get("10.0.0.9").unwrap();
        assert_eq!(server.ssh.user.as_deref(), Some("ops"));
        assert_eq!(server.ssh.port, Some(2222));
        assert_eq!(server.identity_ips(), vec!["10.0.0.9"]);
    }

    #[test]
    fn test_from_json_wrapped() {
        let json = r#"{"hosts": [{
            "host_key": "spine01",
            "device_os": "cisco_nxos",
            "discovery": {"router_id": "10.255.0.1", "mgmt_ip": "10.0.0.1, bogus 10.255.0.1", "protocol": "cdp-only"}
        }]}"#;
        let inventory = Inventory::from_json(json).unwrap();
        let spine = inventory.get("spine01").unwrap();
        assert_eq!(spine.protocol_preference(), ProtocolPreference::Cdp);
        assert_eq!(spine.identity_ips(), vec!["10.255.0.1", "10.0.0.1"]);
    }

    #[test]
    fn test_from_json_invalid() {
        let err = Inventory::from_json(r#"{"routers": 1}"#).unwrap_err();
        assert!(matches!(err, crate::Error::Config(ConfigError::Inventory(_))));
    }

    #[test]
    fn test_connect_host_override() {
        let host = HostRecord::new("leaf01").with_ssh(SshOverrides {
            hostname: Some("192.0.2.11".to_string()),
            ..Default::default()
        });
        assert_eq!(host.connect_host(), "192.0.2.11");
        assert_eq!(HostRecord::new("leaf02").connect_host(), "leaf02");
    }

    #[test]
    fn test_blank_os_is_missing() {
        let host = HostRecord::new("leaf01").with_device_os("  ");
        assert_eq!(host.os(), None);
    }

    #[test]
    fn test_resolve_keeps_unknown_targets() {
        let inventory = Inventory::from_hosts([HostRecord::new("a").with_device_os("linux")]);
        let resolved = inventory.resolve(&["a", "b"]);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].os(), Some("linux"));
        assert_eq!(resolved[1].host_key, "b");
        assert_eq!(resolved[1].os(), None);
    }
}
