//! Parser for Arista EOS `show lldp neighbors detail | json`.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{NeighborEntry, OutputParser, ParseResult, clean_field, ids};
use crate::error::ParseError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EosLldpDetail {
    lldp_neighbors: BTreeMap<String, EosInterface>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EosInterface {
    lldp_neighbor_info: Vec<EosNeighbor>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EosNeighbor {
    system_name: String,
    system_description: Option<String>,
    management_addresses: Vec<EosManagementAddress>,
    neighbor_interface_info: EosNeighborInterface,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EosManagementAddress {
    address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EosNeighborInterface {
    #[serde(rename = "interfaceId")]
    interface_id: String,
    #[serde(rename = "interfaceId_v2")]
    interface_id_v2: String,
    #[serde(rename = "interfaceDescription")]
    interface_description: String,
}

impl EosNeighborInterface {
    /// `interfaceId` is quoted on older releases ("\"Ethernet1\"").
    fn port(&self) -> String {
        [
            &self.interface_id_v2,
            &self.interface_id,
            &self.interface_description,
        ]
        .into_iter()
        .find_map(|candidate| clean_field(candidate))
        .unwrap_or_default()
    }
}

/// Parser for Arista EOS LLDP JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct EosLldpJsonParser;

impl OutputParser for EosLldpJsonParser {
    fn id(&self) -> &str {
        ids::EOS_LLDP_JSON
    }

    fn parse(&self, device_key: &str, raw: &str) -> Result<ParseResult, ParseError> {
        if raw.trim().is_empty() {
            return Err(ParseError::malformed(self.id(), "empty output"));
        }
        let detail: EosLldpDetail = serde_json::from_str(raw)?;

        let mut result = ParseResult::new(device_key);
        for (local_port, interface) in detail.lldp_neighbors {
            for neighbor in interface.lldp_neighbor_info {
                let entry = NeighborEntry {
                    local_port: local_port.clone(),
                    remote_port: neighbor.neighbor_interface_info.port(),
                    remote_name: clean_field(&neighbor.system_name).unwrap_or_default(),
                    remote_mgmt_ips: neighbor
                        .management_addresses
                        .iter()
                        .filter_map(|m| clean_field(&m.address))
                        .collect(),
                    remote_description: neighbor
                        .system_description
                        .as_deref()
                        .and_then(clean_field),
                    remote_platform: None,
                };
                if entry.has_identity() {
                    result.entries.push(entry);
                } else {
                    result
                        .warnings
                        .push(format!("neighbor on {local_port} advertises no name or address"));
                }
            }
        }
        Ok(result)
    }
}
