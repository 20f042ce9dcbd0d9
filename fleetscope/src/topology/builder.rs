//! Assemble a topology graph from collection results.
//!
//! Every target becomes a Configured node. Each reported neighbor is then
//! resolved to a node:
//!
//! 1. a Configured node whose host key matches the advertised name (exact
//!    full name first, then short name),
//! 2. a Configured node claiming one of the advertised IPs,
//! 3. an existing Discovered node with the same name or IP,
//! 4. a new Discovered node keyed by the normalized name, or by the first
//!    valid IP when the name is unusable.
//!
//! Name matches win over IP matches.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use log::debug;

use super::model::{NodeKind, TopologyEdge, TopologyGraph, TopologyNode};
use crate::discovery::{CollectFailure, CollectSuccess};
use crate::error::TopologyError;
use crate::identity::{matches, normalize_full, parse_ip_literal};
use crate::inventory::Inventory;
use crate::parser::NeighborEntry;

/// Build the topology for one discovery run.
///
/// `failures` marks hosts whose collection failed outright; those are always
/// islands, even when a stale result for them is also present. Successes for
/// hosts outside `targets` are ignored with a warning.
pub fn build_graph<S: AsRef<str>>(
    inventory: Option<&Inventory>,
    targets: &[S],
    successes: &[CollectSuccess],
    failures: &[CollectFailure],
) -> Result<TopologyGraph, TopologyError> {
    let inventory = inventory.ok_or(TopologyError::MissingInventory)?;
    let mut builder = GraphBuilder::default();

    let mut results: HashMap<String, &CollectSuccess> = HashMap::new();
    for success in successes {
        results.insert(normalize_full(&success.host.host_key), success);
    }

    for target in targets {
        let target = target.as_ref();
        let id = normalize_full(target);
        if id.is_empty() || builder.graph.nodes.contains_key(&id) {
            continue;
        }
        let host = inventory.get(target).cloned();
        let mut ips: IndexSet<String> = IndexSet::new();
        if let Some(host) = &host {
            ips.extend(host.identity_ips());
        }
        if let Some(ip) = parse_ip_literal(target) {
            ips.insert(ip.to_string());
        }
        if let Some(success) = results.get(&id) {
            ips.extend(
                success
                    .parse_result
                    .identity_hint_ips
                    .iter()
                    .filter_map(|ip| parse_ip_literal(ip))
                    .map(|ip| ip.to_string()),
            );
        }
        let display_name = host
            .as_ref()
            .map(|h| h.host_key.trim().to_string())
            .unwrap_or_else(|| target.trim().to_string());

        builder.add_configured(TopologyNode {
            id,
            display_name,
            kind: NodeKind::Configured,
            identity_ips: ips.into_iter().collect(),
            is_island: false,
            host,
        });
    }

    // Walk results in target order so the edge list does not depend on
    // completion order
    let configured: Vec<String> = builder.configured.clone();
    for id in &configured {
        if let Some(success) = results.remove(id) {
            for entry in &success.parse_result.entries {
                builder.add_neighbor(id, entry);
            }
            builder
                .graph
                .warnings
                .extend(success.parse_result.warnings.iter().map(|w| format!("{id}: {w}")));
        }
    }
    let mut leftovers: Vec<&String> = results.keys().collect();
    leftovers.sort();
    for host in leftovers {
        builder
            .graph
            .warnings
            .push(format!("{host}: result ignored, host is not a discovery target"));
    }

    let failed: HashSet<String> = failures
        .iter()
        .map(|f| normalize_full(&f.host.host_key))
        .collect();
    builder.mark_islands(&failed);

    let graph = builder.graph;
    debug!(
        "topology: {} nodes, {} edges, {} islands, {} warnings",
        graph.nodes.len(),
        graph.edges.len(),
        graph.islands().count(),
        graph.warnings.len()
    );
    Ok(graph)
}

#[derive(Default)]
struct GraphBuilder {
    graph: TopologyGraph,
    /// Configured node ids in target order.
    configured: Vec<String>,
    /// Identity IP to the Configured node that claimed it first.
    configured_ips: IndexMap<String, String>,
    /// Advertised IP to the Discovered node it was first seen on.
    discovered_ips: HashMap<String, String>,
}

impl GraphBuilder {
    fn add_configured(&mut self, node: TopologyNode) {
        for ip in &node.identity_ips {
            match self.configured_ips.get(ip) {
                Some(owner) if owner != &node.id => self.graph.warnings.push(format!(
                    "identity IP {ip} claimed by both {owner} and {}; keeping {owner}",
                    node.id
                )),
                Some(_) => {}
                None => {
                    self.configured_ips.insert(ip.clone(), node.id.clone());
                }
            }
        }
        self.configured.push(node.id.clone());
        self.graph.nodes.insert(node.id.clone(), node);
    }

    fn add_neighbor(&mut self, from: &str, entry: &NeighborEntry) {
        let name = entry.remote_name.trim();
        let mut ips: Vec<String> = Vec::new();
        for candidate in std::iter::once(name).chain(entry.remote_mgmt_ips.iter().map(String::as_str)) {
            if let Some(ip) = parse_ip_literal(candidate) {
                let ip = ip.to_string();
                if !ips.contains(&ip) {
                    ips.push(ip);
                }
            }
        }

        let Some(to) = self.resolve(name, &ips) else {
            self.graph.warnings.push(format!(
                "{from}: neighbor on {} has no usable name or address",
                entry.local_port
            ));
            return;
        };
        if to == from {
            self.graph.warnings.push(format!(
                "{from}: neighbor on {} resolves to the device itself",
                entry.local_port
            ));
            return;
        }

        self.graph.edges.push(TopologyEdge {
            from: from.to_string(),
            to,
            local_port: entry.local_port.clone(),
            remote_port: entry.remote_port.clone(),
        });
    }

    fn resolve(&mut self, name: &str, ips: &[String]) -> Option<String> {
        if !name.is_empty() {
            let full = normalize_full(name);
            if self.configured.contains(&full) {
                return Some(full);
            }
            if let Some(id) = self.configured.iter().find(|id| self.host_key_matches(id, name)) {
                return Some(id.clone());
            }
        }

        if let Some(id) = ips.iter().find_map(|ip| self.configured_ips.get(ip)) {
            return Some(id.clone());
        }

        self.resolve_discovered(name, ips)
    }

    /// Compare against the inventory host key as well as the node id, since
    /// the target may have been spelled differently.
    fn host_key_matches(&self, id: &str, name: &str) -> bool {
        if matches(id, name) {
            return true;
        }
        self.graph
            .nodes
            .get(id)
            .and_then(|node| node.host.as_ref())
            .is_some_and(|host| matches(&host.host_key, name))
    }

    fn resolve_discovered(&mut self, name: &str, ips: &[String]) -> Option<String> {
        let by_name = if name.is_empty() {
            None
        } else {
            let full = normalize_full(name);
            if self.graph.nodes.contains_key(&full) {
                Some(full)
            } else {
                self.graph
                    .nodes
                    .values()
                    .filter(|n| n.kind == NodeKind::Discovered)
                    .find(|n| matches(&n.id, name))
                    .map(|n| n.id.clone())
            }
        };
        let existing = by_name.or_else(|| ips.iter().find_map(|ip| self.discovered_ips.get(ip).cloned()));

        if let Some(id) = existing {
            if let Some(node) = self.graph.nodes.get_mut(&id) {
                for ip in ips {
                    if !node.identity_ips.contains(ip) {
                        node.identity_ips.push(ip.clone());
                    }
                }
            }
            for ip in ips {
                self.discovered_ips.entry(ip.clone()).or_insert_with(|| id.clone());
            }
            return Some(id);
        }

        let (id, display_name) = if !name.is_empty() && parse_ip_literal(name).is_none() {
            (normalize_full(name), name.to_string())
        } else {
            let first = ips.first()?;
            (first.clone(), first.clone())
        };

        for ip in ips {
            self.discovered_ips.entry(ip.clone()).or_insert_with(|| id.clone());
        }
        self.graph.nodes.insert(
            id.clone(),
            TopologyNode {
                id: id.clone(),
                display_name,
                kind: NodeKind::Discovered,
                identity_ips: ips.to_vec(),
                is_island: false,
                host: None,
            },
        );
        Some(id)
    }

    fn mark_islands(&mut self, failed: &HashSet<String>) {
        let mut connected: HashSet<&str> = HashSet::new();
        for edge in &self.graph.edges {
            connected.insert(edge.from.as_str());
            connected.insert(edge.to.as_str());
        }
        let islands: Vec<String> = self
            .configured
            .iter()
            .filter(|id| failed.contains(*id) || !connected.contains(id.as_str()))
            .cloned()
            .collect();
        for id in islands {
            if let Some(node) = self.graph.nodes.get_mut(&id) {
                node.is_island = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{CommandSpec, DiscoveryProtocol};
    use crate::inventory::{DiscoverySettings, HostRecord};
    use crate::parser::ParseResult;

    fn inventory(keys: &[&str]) -> Inventory {
        Inventory::from_hosts(keys.iter().map(|k| HostRecord::new(*k).with_device_os("linux")))
    }

    fn success(host: &str, entries: Vec<NeighborEntry>) -> CollectSuccess {
        let mut parse_result = ParseResult::new(host);
        parse_result.entries = entries;
        CollectSuccess {
            host: HostRecord::new(host),
            spec_used: CommandSpec::new("lldpctl", "lldpctl", "p", DiscoveryProtocol::Lldp),
            parse_result,
            stdout: String::new(),
            stderr: String::new(),
            elapsed: std::time::Duration::ZERO,
        }
    }

    fn failure(host: &str) -> CollectFailure {
        CollectFailure::without_attempts(HostRecord::new(host), "timed out")
    }

    #[test]
    fn test_missing_inventory() {
        let err = build_graph::<&str>(None, &["a"], &[], &[]).unwrap_err();
        assert!(matches!(err, TopologyError::MissingInventory));
    }

    #[test]
    fn test_short_name_match_links_silent_host() {
        let inv = inventory(&["leaf01", "spine01.lab.local"]);
        let results = [success(
            "leaf01",
            vec![NeighborEntry::new("eth0", "SPINE01").with_remote_port("Ethernet1")],
        )];
        let graph = build_graph(Some(&inv), &["leaf01", "spine01.lab.local"], &results, &[]).unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(
            graph.edges,
            vec![TopologyEdge {
                from: "leaf01".to_string(),
                to: "spine01.lab.local".to_string(),
                local_port: "eth0".to_string(),
                remote_port: "Ethernet1".to_string(),
            }]
        );
        assert!(!graph.node("spine01.lab.local").unwrap().is_island);
        assert!(!graph.node("leaf01").unwrap().is_island);
    }

    #[test]
    fn test_failure_wins_over_stale_result() {
        let inv = inventory(&["a", "b"]);
        let results = [success("a", vec![NeighborEntry::new("eth0", "b")])];
        let graph = build_graph(Some(&inv), &["a", "b"], &results, &[failure("a")]).unwrap();
        assert_eq!(graph.edges.len(), 1);
        assert!(graph.node("a").unwrap().is_island);
        assert!(!graph.node("b").unwrap().is_island);
    }

    #[test]
    fn test_unreported_target_is_island() {
        let inv = inventory(&["a", "b", "c"]);
        let results = [success("a", vec![NeighborEntry::new("eth0", "b")])];
        let graph = build_graph(Some(&inv), &["a", "b", "c"], &results, &[]).unwrap();
        assert!(graph.node("c").unwrap().is_island);
        assert_eq!(graph.islands().count(), 1);
    }

    #[test]
    fn test_ip_match_through_identity_ips() {
        let inv = Inventory::from_hosts([
            HostRecord::new("a").with_device_os("linux"),
            HostRecord::new("core1").with_discovery(DiscoverySettings {
                router_id: "10.255.0.1".to_string(),
                mgmt_ip: "192.0.2.10".to_string(),
                ..Default::default()
            }),
        ]);
        let results = [success(
            "a",
            vec![NeighborEntry::new("eth1", "oob-name-unknown").with_mgmt_ip("192.0.2.10")],
        )];
        let graph = build_graph(Some(&inv), &["a", "core1"], &results, &[]).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges[0].to, "core1");
    }

    #[test]
    fn test_name_wins_over_ip() {
        let inv = Inventory::from_hosts([
            HostRecord::new("a"),
            HostRecord::new("b"),
            HostRecord::new("c").with_discovery(DiscoverySettings {
                mgmt_ip: "10.0.0.3".to_string(),
                ..Default::default()
            }),
        ]);
        let results = [success(
            "a",
            vec![NeighborEntry::new("eth0", "b.lab").with_mgmt_ip("10.0.0.3")],
        )];
        let graph = build_graph(Some(&inv), &["a", "b", "c"], &results, &[]).unwrap();
        assert_eq!(graph.edges[0].to, "b");
    }

    #[test]
    fn test_unmatched_neighbors_become_discovered() {
        let inv = inventory(&["a", "b"]);
        let results = [
            success(
                "a",
                vec![
                    NeighborEntry::new("eth0", "Server9.lab.local.").with_mgmt_ip("198.51.100.9"),
                    NeighborEntry::new("eth1", "").with_mgmt_ip("198.51.100.20"),
                ],
            ),
            success(
                "b",
                vec![
                    NeighborEntry::new("eth0", "server9"),
                    NeighborEntry::new("eth1", "").with_mgmt_ip("198.51.100.20"),
                ],
            ),
        ];
        let graph = build_graph(Some(&inv), &["a", "b"], &results, &[]).unwrap();

        let discovered: Vec<&str> = graph
            .nodes
            .values()
            .filter(|n| n.kind == NodeKind::Discovered)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(discovered, vec!["server9.lab.local", "198.51.100.20"]);
        assert_eq!(graph.edges.len(), 4);
        assert_eq!(graph.edges[2].to, "server9.lab.local");
        assert_eq!(
            graph.node("server9.lab.local").unwrap().display_name,
            "Server9.lab.local."
        );
    }

    #[test]
    fn test_duplicate_identity_ip_first_wins() {
        let shared = DiscoverySettings {
            mgmt_ip: "10.9.9.9".to_string(),
            ..Default::default()
        };
        let inv = Inventory::from_hosts([
            HostRecord::new("a"),
            HostRecord::new("b").with_discovery(shared.clone()),
            HostRecord::new("c").with_discovery(shared),
        ]);
        let results = [success("a", vec![NeighborEntry::new("eth0", "").with_mgmt_ip("10.9.9.9")])];
        let graph = build_graph(Some(&inv), &["a", "b", "c"], &results, &[]).unwrap();

        assert_eq!(graph.edges[0].to, "b");
        assert!(graph.warnings.iter().any(|w| w.contains("10.9.9.9") && w.contains("keeping b")));
    }

    #[test]
    fn test_self_loop_and_anonymous_are_skipped() {
        let inv = inventory(&["a"]);
        let results = [success(
            "a",
            vec![
                NeighborEntry::new("lo", "A.lab"),
                NeighborEntry::new("eth9", "  "),
            ],
        )];
        let graph = build_graph(Some(&inv), &["a"], &results, &[]).unwrap();
        assert!(graph.edges.is_empty());
        assert_eq!(graph.warnings.len(), 2);
        assert!(graph.node("a").unwrap().is_island);
    }

    #[test]
    fn test_parallel_links_are_kept() {
        let inv = inventory(&["a", "b"]);
        let results = [
            success(
                "a",
                vec![
                    NeighborEntry::new("eth0", "b").with_remote_port("eth0"),
                    NeighborEntry::new("eth1", "b").with_remote_port("eth1"),
                ],
            ),
            success("b", vec![NeighborEntry::new("eth0", "a").with_remote_port("eth0")]),
        ];
        let graph = build_graph(Some(&inv), &["a", "b"], &results, &[]).unwrap();
        assert_eq!(graph.edges.len(), 3);
    }

    #[test]
    fn test_result_order_does_not_matter() {
        let inv = inventory(&["a", "b"]);
        let ab = success("a", vec![NeighborEntry::new("eth0", "b")]);
        let ba = success("b", vec![NeighborEntry::new("eth0", "a")]);
        let first = build_graph(Some(&inv), &["a", "b"], &[ab.clone(), ba.clone()], &[]).unwrap();
        let second = build_graph(Some(&inv), &["a", "b"], &[ba, ab], &[]).unwrap();
        assert_eq!(first.edges, second.edges);
    }

    #[test]
    fn test_non_target_result_ignored() {
        let inv = inventory(&["a", "z"]);
        let results = [success("z", vec![NeighborEntry::new("eth0", "a")])];
        let graph = build_graph(Some(&inv), &["a"], &results, &[]).unwrap();
        assert!(graph.edges.is_empty());
        assert!(graph.warnings[0].contains("not a discovery target"));
    }
}
