//! Spine selection and BFS layering.
//!
//! A readability heuristic, not a statement about the real hierarchy. The
//! best connected nodes become spines and everything else is placed by hop
//! distance from the nearest spine. All ordering goes through sorted
//! collections so identical graphs always lay out identically.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::model::{NodeKind, TopologyGraph, TopologyNode};

/// Deepest layer; anything further away is folded into it.
pub const MAX_LAYER: usize = 4;

/// Number of spines to pick for a graph of `node_count` nodes.
pub fn spine_count(node_count: usize) -> usize {
    match node_count {
        0..=5 => 2,
        6..=9 => 3,
        _ => 4,
    }
}

/// Sort key for placing nodes by name: case-insensitive, id as tiebreak.
pub(crate) fn name_key(node: &TopologyNode) -> (String, &str) {
    (node.display_name.to_lowercase(), node.id.as_str())
}

/// Undirected adjacency, sorted, without self entries.
pub(crate) fn adjacency(graph: &TopologyGraph) -> BTreeMap<&str, BTreeSet<&str>> {
    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = graph
        .nodes
        .keys()
        .map(|id| (id.as_str(), BTreeSet::new()))
        .collect();
    for edge in &graph.edges {
        if edge.from == edge.to {
            continue;
        }
        if let Some(set) = adjacency.get_mut(edge.from.as_str()) {
            set.insert(edge.to.as_str());
        }
        if let Some(set) = adjacency.get_mut(edge.to.as_str()) {
            set.insert(edge.from.as_str());
        }
    }
    adjacency
}

/// Undirected degree per node, counting every edge.
pub fn degrees(graph: &TopologyGraph) -> BTreeMap<&str, usize> {
    let mut degrees: BTreeMap<&str, usize> =
        graph.nodes.keys().map(|id| (id.as_str(), 0)).collect();
    for edge in &graph.edges {
        for end in [edge.from.as_str(), edge.to.as_str()] {
            if let Some(d) = degrees.get_mut(end) {
                *d += 1;
            }
        }
    }
    degrees
}

/// Result of layering a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    /// Spine ids, best first.
    pub spines: Vec<String>,
    /// Node ids per layer, layer 0 being the spines, each sorted by name.
    pub layers: Vec<Vec<String>>,
    /// Nodes no spine reaches, sorted by name.
    pub other: Vec<String>,
}

impl Layout {
    /// Layer of `id`, or `None` for the unreached bucket.
    pub fn layer_of(&self, id: &str) -> Option<usize> {
        self.layers
            .iter()
            .position(|layer| layer.iter().any(|n| n == id))
    }
}

/// Choose spines: up to [`spine_count`] nodes with degree above zero,
/// ordered by degree, then Configured before Discovered, then name.
///
/// A graph with no edges gets its first node by name as the only spine.
pub fn select_spines(graph: &TopologyGraph) -> Vec<String> {
    let degrees = degrees(graph);
    let mut candidates: Vec<&TopologyNode> = graph
        .nodes
        .values()
        .filter(|n| degrees.get(n.id.as_str()).copied().unwrap_or(0) > 0)
        .collect();
    candidates.sort_by(|a, b| {
        let da = degrees.get(a.id.as_str()).copied().unwrap_or(0);
        let db = degrees.get(b.id.as_str()).copied().unwrap_or(0);
        db.cmp(&da)
            .then_with(|| kind_rank(a.kind).cmp(&kind_rank(b.kind)))
            .then_with(|| name_key(a).cmp(&name_key(b)))
    });

    let spines: Vec<String> = candidates
        .into_iter()
        .take(spine_count(graph.nodes.len()))
        .map(|n| n.id.clone())
        .collect();
    if !spines.is_empty() {
        return spines;
    }

    graph
        .nodes
        .values()
        .min_by(|a, b| name_key(a).cmp(&name_key(b)))
        .map(|n| vec![n.id.clone()])
        .unwrap_or_default()
}

fn kind_rank(kind: NodeKind) -> u8 {
    match kind {
        NodeKind::Configured => 0,
        NodeKind::Discovered => 1,
    }
}

/// Layer the graph by multi-source BFS from the spines.
pub fn compute_layout(graph: &TopologyGraph) -> Layout {
    let spines = select_spines(graph);
    let adjacency = adjacency(graph);

    let mut distance: BTreeMap<&str, usize> = BTreeMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    for spine in &spines {
        distance.insert(spine.as_str(), 0);
        queue.push_back(spine.as_str());
    }
    while let Some(id) = queue.pop_front() {
        let next = distance[id] + 1;
        for &neighbor in adjacency.get(id).into_iter().flatten() {
            if !distance.contains_key(neighbor) {
                distance.insert(neighbor, next);
                queue.push_back(neighbor);
            }
        }
    }

    let deepest = distance.values().copied().max().map(|d| d.min(MAX_LAYER));
    let mut layers: Vec<Vec<&TopologyNode>> = match deepest {
        Some(d) => vec![Vec::new(); d + 1],
        None => Vec::new(),
    };
    let mut other: Vec<&TopologyNode> = Vec::new();
    for node in graph.nodes.values() {
        match distance.get(node.id.as_str()) {
            Some(&d) => layers[d.min(MAX_LAYER)].push(node),
            None => other.push(node),
        }
    }

    let sorted = |mut nodes: Vec<&TopologyNode>| -> Vec<String> {
        nodes.sort_by(|a, b| name_key(a).cmp(&name_key(b)));
        nodes.into_iter().map(|n| n.id.clone()).collect()
    };

    Layout {
        spines,
        layers: layers.into_iter().map(sorted).collect(),
        other: sorted(other),
    }
}
