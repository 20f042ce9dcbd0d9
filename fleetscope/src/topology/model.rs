//! Topology graph types.

use indexmap::IndexMap;

use crate::identity::{normalize_full, parse_ip_literal};
use crate::inventory::HostRecord;

/// Where a node came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// One of the discovery targets.
    Configured,
    /// Only known because a neighbor advertised it.
    Discovered,
}

/// A device in the topology.
#[derive(Debug, Clone)]
pub struct TopologyNode {
    /// Normalized identity, unique within a graph.
    pub id: String,
    pub display_name: String,
    pub kind: NodeKind,
    pub identity_ips: Vec<String>,
    /// Configured node with no adjacency, or whose collection failed.
    pub is_island: bool,
    /// Inventory record backing a Configured node.
    pub host: Option<HostRecord>,
}

impl TopologyNode {
    pub fn is_configured(&self) -> bool {
        self.kind == NodeKind::Configured
    }
}

/// One observed adjacency, directed from the device that reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyEdge {
    pub from: String,
    pub to: String,
    pub local_port: String,
    pub remote_port: String,
}

/// Nodes in insertion order plus every observed edge.
///
/// Edges are not de-duplicated: two physical links between the same pair
/// are two edges, and both ends reporting the same link gives one edge in
/// each direction.
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    pub nodes: IndexMap<String, TopologyNode>,
    pub edges: Vec<TopologyEdge>,
    /// Diagnostics collected while assembling the graph.
    pub warnings: Vec<String>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every target as an edgeless island, for when there is nothing to
    /// reconcile against.
    pub fn islands_only<S: AsRef<str>>(targets: &[S]) -> Self {
        let mut graph = Self::new();
        for target in targets {
            let target = target.as_ref().trim();
            let id = normalize_full(target);
            if id.is_empty() || graph.nodes.contains_key(&id) {
                continue;
            }
            let identity_ips = parse_ip_literal(target)
                .map(|ip| vec![ip.to_string()])
                .unwrap_or_default();
            graph.nodes.insert(
                id.clone(),
                TopologyNode {
                    id,
                    display_name: target.to_string(),
                    kind: NodeKind::Configured,
                    identity_ips,
                    is_island: true,
                    host: None,
                },
            );
        }
        graph
    }

    pub fn node(&self, id: &str) -> Option<&TopologyNode> {
        self.nodes.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of edges touching `id`, in either direction.
    pub fn degree(&self, id: &str) -> usize {
        self.edges
            .iter()
            .filter(|e| e.from == id || e.to == id)
            .count()
    }

    pub fn islands(&self) -> impl Iterator<Item = &TopologyNode> {
        self.nodes.values().filter(|n| n.is_island)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_islands_only() {
        let graph = TopologyGraph::islands_only(&["Leaf01.lab.", "leaf01.lab", " 10.0.0.5 ", ""]);
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.edges.is_empty());
        assert!(graph.nodes.values().all(|n| n.is_island));

        let leaf = graph.node("leaf01.lab").unwrap();
        assert_eq!(leaf.display_name, "Leaf01.lab.");
        assert_eq!(graph.node("10.0.0.5").unwrap().identity_ips, vec!["10.0.0.5"]);
        assert_eq!(graph.islands().count(), 2);
    }

    #[test]
    fn test_degree_counts_both_directions() {
        let mut graph = TopologyGraph::islands_only(&["a", "b", "c"]);
        for (from, to) in [("a", "b"), ("b", "a"), ("a", "c")] {
            graph.edges.push(TopologyEdge {
                from: from.to_string(),
                to: to.to_string(),
                local_port: String::new(),
                remote_port: String::new(),
            });
        }
        assert_eq!(graph.degree("a"), 3);
        assert_eq!(graph.degree("b"), 2);
        assert_eq!(graph.degree("c"), 1);
    }
}
