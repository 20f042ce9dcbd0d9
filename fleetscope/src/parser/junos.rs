//! Parser for Junos `show lldp neighbors | display json`.
//!
//! Junos JSON wraps every leaf in a one-element array of `{"data": ...}`
//! objects, so the document is walked as a [`serde_json::Value`] rather than
//! through typed structs.

use serde_json::Value;

use super::{NeighborEntry, OutputParser, ParseResult, clean_field, ids};
use crate::error::ParseError;

/// Parser for Junos LLDP JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JunosLldpJsonParser;

/// First `data` value of a Junos leaf.
fn leaf(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)?
        .as_array()?
        .first()?
        .get("data")?
        .as_str()
        .and_then(clean_field)
}

fn leaves(object: &Value, key: &str) -> Vec<String> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("data").and_then(Value::as_str))
                .filter_map(clean_field)
                .collect()
        })
        .unwrap_or_default()
}

impl OutputParser for JunosLldpJsonParser {
    fn id(&self) -> &str {
        ids::JUNOS_LLDP_JSON
    }

    fn parse(&self, device_key: &str, raw: &str) -> Result<ParseResult, ParseError> {
        if raw.trim().is_empty() {
            return Err(ParseError::malformed(self.id(), "empty output"));
        }
        let document: Value = serde_json::from_str(raw)?;
        let sections = document
            .get("lldp-neighbors-information")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ParseError::malformed(self.id(), "missing lldp-neighbors-information")
            })?;

        let mut result = ParseResult::new(device_key);
        let neighbors = sections
            .iter()
            .filter_map(|section| section.get("lldp-neighbor-information"))
            .filter_map(Value::as_array)
            .flatten();

        for neighbor in neighbors {
            let local_port = leaf(neighbor, "lldp-local-port-id")
                .or_else(|| leaf(neighbor, "lldp-local-interface"))
                .unwrap_or_default();
            let remote_port = leaf(neighbor, "lldp-remote-port-id")
                .or_else(|| leaf(neighbor, "lldp-remote-port-description"))
                .unwrap_or_default();
            let entry = NeighborEntry {
                local_port,
                remote_port,
                remote_name: leaf(neighbor, "lldp-remote-system-name").unwrap_or_default(),
                remote_mgmt_ips: leaves(neighbor, "lldp-remote-management-address"),
                remote_description: leaf(neighbor, "lldp-system-description"),
                remote_platform: None,
            };
            if entry.has_identity() {
                result.entries.push(entry);
            } else {
                result.warnings.push(format!(
                    "neighbor on {} advertises no name or address",
                    entry.local_port
                ));
            }
        }
        Ok(result)
    }
}
