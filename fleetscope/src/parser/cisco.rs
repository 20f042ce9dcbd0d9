//! Parsers for Cisco IOS / IOS-XE / NX-OS neighbor detail output.
//!
//! Both `show lldp neighbors detail` and `show cdp neighbors detail` print
//! one block per neighbor. Blocks are located by an anchor line and each
//! field is pulled out of its block with a line-anchored regex.
//!
//! Over a non-interactive exec channel IOS reports CLI errors on stdout with
//! a zero exit status (`% LLDP is not enabled`), so such lines are turned
//! into a parse error. That keeps the fallback chain moving on to CDP.

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

use super::{NeighborEntry, OutputParser, ParseResult, clean_field, ids};
use crate::error::ParseError;
use crate::identity::parse_ip_literal;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("static cisco pattern")
}

static TOTAL: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^Total (?:cdp )?entries displayed\s*:\s*\d+$"));

// LLDP
static LLDP_LOCAL_INTF: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*Local Intf:[ \t]*(?P<v>\S+)"));
static LLDP_CHASSIS: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*Chassis id:"));
static LLDP_LOCAL_PORT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*Local (?:Intf|Port id):[ \t]*(?P<v>\S+)"));
static LLDP_PORT_ID: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*Port id:[ \t]*(?P<v>\S+)"));
static LLDP_PORT_DESCR: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*Port Description:[ \t]*(?P<v>.+?)[ \t]*$"));
static LLDP_SYSTEM_NAME: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*System Name:[ \t]*(?P<v>\S+)"));
static LLDP_MGMT: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?:IP|IPV6|IPv4|Management Address(?: IPV6)?):[ \t]*(?P<v>\S+)")
});

// CDP
static CDP_DEVICE_ID: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*Device ID:[ \t]*(?P<v>\S+)"));
static CDP_SYSTEM_NAME: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*System Name:[ \t]*(?P<v>\S+)"));
static CDP_INTERFACE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"(?m)^[ \t]*Interface:[ \t]*(?P<local>[^,\n]+),[ \t]*Port ID \(outgoing port\):[ \t]*(?P<remote>\S+)",
    )
});
static CDP_PLATFORM: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*Platform:[ \t]*(?P<v>[^,\n]+)"));
static CDP_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?:IP address|IPv4 Address|IPv6 address|IPv6 Address):[ \t]*(?P<v>\S+)")
});

fn capture(re: &Regex, block: &str) -> Option<String> {
    re.captures(block)
        .and_then(|caps| caps.name("v").and_then(|m| clean_field(m.as_str())))
}

fn addresses(re: &Regex, block: &str) -> Vec<String> {
    let mut found = IndexSet::new();
    for caps in re.captures_iter(block) {
        if let Some(ip) = caps.name("v").and_then(|m| parse_ip_literal(m.as_str())) {
            found.insert(ip.to_string());
        }
    }
    found.into_iter().collect()
}

/// First line that is a CLI error (`% ...`).
fn cli_error(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| line.starts_with('%'))
}

/// Split `text` into blocks starting at each match of `anchor`.
fn blocks<'a>(text: &'a str, anchor: &Regex) -> Vec<&'a str> {
    let starts: Vec<usize> = anchor.find_iter(text).map(|m| m.start()).collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .collect()
}

/// Output with no neighbor blocks: fine if it is only blank lines, totals
/// and the capability legend, otherwise something unexpected was printed.
fn check_empty(parser: &str, text: &str) -> Result<(), ParseError> {
    // The legend runs from "Capability codes" to the next blank line
    let mut in_legend = false;
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            in_legend = false;
            continue;
        }
        if line.starts_with("Capability codes") {
            in_legend = true;
            continue;
        }
        if in_legend || line.chars().all(|c| c == '-') || TOTAL.is_match(line) {
            continue;
        }
        return Err(ParseError::malformed(
            parser,
            format!("no neighbor blocks found, got: {line}"),
        ));
    }
    Ok(())
}

/// Parser for `show lldp neighbors detail` on IOS / IOS-XE / NX-OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct CiscoLldpDetailParser;

impl OutputParser for CiscoLldpDetailParser {
    fn id(&self) -> &str {
        ids::CISCO_LLDP_DETAIL
    }

    fn parse(&self, device_key: &str, raw: &str) -> Result<ParseResult, ParseError> {
        let text = raw.replace('\r', "");
        if let Some(line) = cli_error(&text) {
            return Err(ParseError::malformed(self.id(), line));
        }

        // IOS blocks open with "Local Intf:", NX-OS blocks with "Chassis id:"
        let anchor: &Regex = if LLDP_LOCAL_INTF.is_match(&text) {
            &LLDP_LOCAL_INTF
        } else {
            &LLDP_CHASSIS
        };
        let blocks = blocks(&text, anchor);
        if blocks.is_empty() {
            check_empty(self.id(), &text)?;
        }

        let mut result = ParseResult::new(device_key);
        for block in blocks {
            let local_port = capture(&LLDP_LOCAL_PORT, block).unwrap_or_default();
            let entry = NeighborEntry {
                remote_port: capture(&LLDP_PORT_ID, block)
                    .or_else(|| capture(&LLDP_PORT_DESCR, block))
                    .unwrap_or_default(),
                remote_name: capture(&LLDP_SYSTEM_NAME, block).unwrap_or_default(),
                remote_mgmt_ips: addresses(&LLDP_MGMT, block),
                remote_description: None,
                remote_platform: None,
                local_port,
            };
            if entry.local_port.is_empty() {
                result
                    .warnings
                    .push("lldp neighbor block without a local port".to_string());
            } else if entry.has_identity() {
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

/// Parser for `show cdp neighbors detail` on IOS / IOS-XE / NX-OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct CdpDetailParser;

impl OutputParser for CdpDetailParser {
    fn id(&self) -> &str {
        ids::CISCO_CDP_DETAIL
    }

    fn parse(&self, device_key: &str, raw: &str) -> Result<ParseResult, ParseError> {
        let text = raw.replace('\r', "");
        if let Some(line) = cli_error(&text) {
            return Err(ParseError::malformed(self.id(), line));
        }

        let blocks = blocks(&text, &CDP_DEVICE_ID);
        if blocks.is_empty() {
            check_empty(self.id(), &text)?;
        }

        let mut result = ParseResult::new(device_key);
        for block in blocks {
            // NX-OS appends the serial number: "leaf02(FDO1234X0AB)"
            let device_id = capture(&CDP_DEVICE_ID, block)
                .map(|id| id.split('(').next().unwrap_or_default().to_string())
                .unwrap_or_default();
            let remote_name = capture(&CDP_SYSTEM_NAME, block).unwrap_or(device_id);

            let Some(ports) = CDP_INTERFACE.captures(block) else {
                result
                    .warnings
                    .push(format!("cdp neighbor {remote_name} has no interface line"));
                continue;
            };

            let entry = NeighborEntry {
                local_port: ports["local"].trim().to_string(),
                remote_port: ports["remote"].trim().to_string(),
                remote_name,
                remote_mgmt_ips: addresses(&CDP_ADDRESS, block),
                remote_description: None,
                remote_platform: capture(&CDP_PLATFORM, block),
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
