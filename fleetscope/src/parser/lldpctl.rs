//! Parser for lldpd's `lldpctl -f keyvalue` output.
//!
//! ```text
//! lldp.eth0.via=LLDP
//! lldp.eth0.rid=1
//! lldp.eth0.chassis.name=spine01.lab.local
//! lldp.eth0.chassis.mgmt-ip=10.0.0.1
//! lldp.eth0.port.ifname=Ethernet1
//! ```
//!
//! Interface names may themselves contain dots (`eth0.100`), so the split
//! between interface and field is found by looking for a known field prefix.
//! Several neighbors on one interface are told apart by their `rid`.
//!
//! `lldpcli show chassis -f keyvalue` output may be appended; its
//! `local-chassis.chassis.mgmt-ip` keys become identity hints for the
//! queried device.

use std::collections::HashMap;
use std::sync::LazyLock;

use indexmap::IndexMap;
use log::trace;
use regex::Regex;

use super::{NeighborEntry, OutputParser, ParseResult, clean_field, ids};
use crate::error::ParseError;
use crate::identity::parse_ip_literal;

static LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^lldp\.(?P<iface>[^=]+?)\.(?P<field>via|rid|age|chassis\.[^=]+|port\.[^=]+|vlan[^=]*|ppvid[^=]*|pi[^=]*|lldp-med[^=]*|unknown-tlvs[^=]*)=(?P<value>.*)$",
    )
    .expect("static lldpctl pattern")
});

static LOCAL_MGMT_IP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^local-chassis\.chassis\.mgmt-ip=(?P<value>.*)$")
        .expect("static lldpctl local chassis pattern")
});

#[derive(Debug, Default)]
struct PendingNeighbor {
    local_port: String,
    name: Option<String>,
    description: Option<String>,
    port_ifname: Option<String>,
    port_local: Option<String>,
    port_descr: Option<String>,
    port_mac: Option<String>,
    mgmt_ips: Vec<String>,
}

impl PendingNeighbor {
    fn tracks(field: &str) -> bool {
        matches!(
            field,
            "chassis.name"
                | "chassis.descr"
                | "chassis.mgmt-ip"
                | "port.ifname"
                | "port.local"
                | "port.descr"
                | "port.mac"
        )
    }

    fn apply(&mut self, field: &str, value: &str) {
        let Some(value) = clean_field(value) else {
            return;
        };
        match field {
            "chassis.name" => self.name = Some(value),
            "chassis.descr" => self.description = Some(value),
            "chassis.mgmt-ip" => self.mgmt_ips.push(value),
            "port.ifname" => self.port_ifname = Some(value),
            "port.local" => self.port_local = Some(value),
            "port.descr" => self.port_descr = Some(value),
            "port.mac" => self.port_mac = Some(value),
            _ => {}
        }
    }

    fn into_entry(self) -> NeighborEntry {
        let remote_port = self
            .port_ifname
            .or(self.port_local)
            .or(self.port_descr)
            .or(self.port_mac)
            .unwrap_or_default();
        NeighborEntry {
            local_port: self.local_port,
            remote_port,
            remote_name: self.name.unwrap_or_default(),
            remote_mgmt_ips: self.mgmt_ips,
            remote_description: self.description,
            remote_platform: None,
        }
    }
}

/// Parser for `lldpctl -f keyvalue`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LldpctlKeyValueParser;

impl OutputParser for LldpctlKeyValueParser {
    fn id(&self) -> &str {
        ids::LLDPCTL_KEYVALUE
    }

    fn parse(&self, device_key: &str, raw: &str) -> Result<ParseResult, ParseError> {
        let mut result = ParseResult::new(device_key);
        let mut neighbors: IndexMap<(String, String), PendingNeighbor> = IndexMap::new();
        let mut current_rid: HashMap<String, String> = HashMap::new();
        let mut matched = 0usize;
        let mut unrecognized = 0usize;

        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.starts_with("local-chassis.") {
                matched += 1;
                if let Some(ip) = LOCAL_MGMT_IP
                    .captures(line)
                    .and_then(|caps| parse_ip_literal(&caps["value"]))
                {
                    let ip = ip.to_string();
                    if !result.identity_hint_ips.contains(&ip) {
                        result.identity_hint_ips.push(ip);
                    }
                }
                continue;
            }
            let Some(caps) = LINE.captures(line) else {
                unrecognized += 1;
                if line.starts_with("lldp.") {
                    result
                        .warnings
                        .push(format!("unrecognized lldpctl line: {line}"));
                }
                continue;
            };
            matched += 1;

            let iface = &caps["iface"];
            let field = &caps["field"];
            let value = &caps["value"];

            if field == "rid" {
                current_rid.insert(iface.to_string(), value.trim().to_string());
                continue;
            }
            if !PendingNeighbor::tracks(field) {
                continue;
            }
            let rid = current_rid.get(iface).cloned().unwrap_or_default();
            let pending = neighbors
                .entry((iface.to_string(), rid))
                .or_insert_with(|| PendingNeighbor {
                    local_port: iface.to_string(),
                    ..Default::default()
                });
            pending.apply(field, value);
        }

        if matched == 0 && unrecognized > 0 {
            return Err(ParseError::malformed(
                self.id(),
                "output contains no lldpctl key=value lines",
            ));
        }

        for ((iface, _), pending) in neighbors {
            let entry = pending.into_entry();
            if entry.has_identity() {
                result.entries.push(entry);
            } else {
                result
                    .warnings
                    .push(format!("neighbor on {iface} advertises no name or address"));
            }
        }

        trace!(
            "lldpctl: {} neighbors for {}",
            result.entries.len(),
            device_key
        );
        Ok(result)
    }
}
