//! Text renderings of a topology graph.
//!
//! Three views share one set of options:
//!
//! - [`render_layered`]: spines first, then each BFS layer, with up to four
//!   neighbor hints per node.
//! - [`render_edges`]: sorted edge list where both directions of a link
//!   collapse into one row. This is the view to trust.
//! - [`render_flat`]: one line per node with its link count.
//!
//! Identical graphs and options always render byte-identical text.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use super::layout::{Layout, adjacency, compute_layout, degrees, name_key};
use super::model::{NodeKind, TopologyGraph, TopologyNode};
use crate::identity::{matches, normalize_full};

/// Neighbor hints shown per node before eliding the rest.
pub const MAX_NEIGHBOR_HINTS: usize = 4;

const EMPTY_GRAPH: &str = "(no nodes)";

/// How to render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Node to highlight, by id or any spelling of its name.
    pub focused: Option<String>,
    /// Maximum line width in characters; 0 means unlimited.
    pub width: usize,
    /// Unicode box and arrow glyphs instead of ASCII.
    pub rich_glyphs: bool,
}

impl RenderOptions {
    pub fn focused(mut self, node: impl Into<String>) -> Self {
        self.focused = Some(node.into());
        self
    }

    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn rich_glyphs(mut self, rich: bool) -> Self {
        self.rich_glyphs = rich;
        self
    }
}

struct Glyphs {
    focus: &'static str,
    branch: &'static str,
    last_branch: &'static str,
    link: &'static str,
    ellipsis: &'static str,
}

const ASCII: Glyphs = Glyphs {
    focus: "> ",
    branch: "|-- ",
    last_branch: "`-- ",
    link: "<->",
    ellipsis: "...",
};

const RICH: Glyphs = Glyphs {
    focus: "▶ ",
    branch: "├── ",
    last_branch: "└── ",
    link: "↔",
    ellipsis: "…",
};

/// Shared state for one render call.
struct Renderer<'a> {
    graph: &'a TopologyGraph,
    glyphs: &'static Glyphs,
    width: usize,
    focused: Option<&'a str>,
    lines: Vec<String>,
}

impl<'a> Renderer<'a> {
    fn new(graph: &'a TopologyGraph, opts: &RenderOptions) -> Self {
        Self {
            graph,
            glyphs: if opts.rich_glyphs { &RICH } else { &ASCII },
            width: opts.width,
            focused: opts
                .focused
                .as_deref()
                .and_then(|f| focused_id(graph, f)),
            lines: Vec::new(),
        }
    }

    fn push(&mut self, line: String) {
        let line = truncate(&line, self.width, self.glyphs.ellipsis);
        self.lines.push(line);
    }

    /// Focus marker column, present only when a focused node exists.
    fn marker(&self, highlighted: bool) -> &'static str {
        match self.focused {
            Some(_) if highlighted => self.glyphs.focus,
            Some(_) => "  ",
            None => "",
        }
    }

    fn is_focused(&self, id: &str) -> bool {
        self.focused == Some(id)
    }

    fn name(&self, id: &str) -> &'a str {
        self.graph
            .nodes
            .get(id)
            .map(|n| n.display_name.as_str())
            .unwrap_or("?")
    }

    fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

/// Resolve the focus request to a node id.
fn focused_id<'a>(graph: &'a TopologyGraph, focused: &str) -> Option<&'a str> {
    let id = normalize_full(focused);
    if let Some((key, _)) = graph.nodes.get_key_value(&id) {
        return Some(key.as_str());
    }
    sorted_nodes(graph)
        .into_iter()
        .find(|n| matches(&n.display_name, focused) || matches(&n.id, focused))
        .map(|n| n.id.as_str())
}

fn sorted_nodes(graph: &TopologyGraph) -> Vec<&TopologyNode> {
    let mut nodes: Vec<&TopologyNode> = graph.nodes.values().collect();
    nodes.sort_by(|a, b| name_key(a).cmp(&name_key(b)));
    nodes
}

/// Cut `line` to `width` characters, marking the cut with `ellipsis`.
fn truncate(line: &str, width: usize, ellipsis: &str) -> String {
    if width == 0 || line.chars().count() <= width {
        return line.to_string();
    }
    let keep = width.saturating_sub(ellipsis.chars().count());
    if keep == 0 {
        return line.chars().take(width).collect();
    }
    let mut cut: String = line.chars().take(keep).collect();
    cut.push_str(ellipsis);
    cut
}

fn node_tags(node: &TopologyNode) -> String {
    let mut tags = String::new();
    if node.kind == NodeKind::Discovered {
        tags.push_str(" (discovered)");
    }
    if node.is_island {
        tags.push_str(" (island)");
    }
    tags
}

fn port(p: &str) -> &str {
    if p.trim().is_empty() { "?" } else { p }
}

/// Port pairs between `id` and `other`, from `id`'s side, sorted.
fn port_pairs<'g>(graph: &'g TopologyGraph, id: &str, other: &str) -> Vec<(&'g str, &'g str)> {
    let mut pairs: Vec<(&str, &str)> = graph
        .edges
        .iter()
        .filter_map(|e| {
            if e.from == id && e.to == other {
                Some((e.local_port.as_str(), e.remote_port.as_str()))
            } else if e.to == id && e.from == other {
                Some((e.remote_port.as_str(), e.local_port.as_str()))
            } else {
                None
            }
        })
        .collect();
    pairs.sort_unstable();
    pairs.dedup();
    pairs
}

/// Render spines and BFS layers with neighbor hints.
pub fn render_layered(graph: &TopologyGraph, opts: &RenderOptions) -> String {
    if graph.is_empty() {
        return format!("{EMPTY_GRAPH}\n");
    }
    let layout = compute_layout(graph);
    let adjacency = adjacency(graph);
    let degrees = degrees(graph);
    let mut r = Renderer::new(graph, opts);

    let mut sections: Vec<(String, Option<usize>, &Vec<String>)> = layout
        .layers
        .iter()
        .enumerate()
        .map(|(i, ids)| {
            let title = if i == 0 {
                "Layer 0 (spines)".to_string()
            } else {
                format!("Layer {i}")
            };
            (title, Some(i), ids)
        })
        .collect();
    if !layout.other.is_empty() {
        sections.push(("Unreached".to_string(), None, &layout.other));
    }

    for (title, layer, ids) in sections {
        r.push(title);
        for id in ids {
            let Some(node) = graph.nodes.get(id) else {
                continue;
            };
            let links = degrees.get(id.as_str()).copied().unwrap_or(0);
            let line = format!(
                "{}{}{} [{} link{}]",
                r.marker(r.is_focused(id)),
                node.display_name,
                node_tags(node),
                links,
                if links == 1 { "" } else { "s" }
            );
            r.push(format!("  {line}"));
            push_hints(&mut r, &layout, &adjacency, id, layer);
        }
    }

    r.finish()
}

fn push_hints(
    r: &mut Renderer<'_>,
    layout: &Layout,
    adjacency: &BTreeMap<&str, BTreeSet<&str>>,
    id: &str,
    layer: Option<usize>,
) {
    let Some(neighbors) = adjacency.get(id) else {
        return;
    };
    let in_layer = |wanted: Option<usize>| -> Vec<&str> {
        neighbors
            .iter()
            .copied()
            .filter(|n| match wanted {
                Some(l) => layout.layer_of(n) == Some(l),
                None => layout.other.iter().any(|o| o == n),
            })
            .collect()
    };

    let mut shown = match layer {
        Some(l) => {
            let next = in_layer(Some(l + 1));
            if next.is_empty() { in_layer(Some(l)) } else { next }
        }
        None => in_layer(None),
    };
    if shown.is_empty() {
        return;
    }
    shown.sort_by_key(|n| (r.name(n).to_lowercase(), n.to_string()));

    let hidden = shown.len().saturating_sub(MAX_NEIGHBOR_HINTS);
    shown.truncate(MAX_NEIGHBOR_HINTS);

    let count = shown.len();
    for (i, neighbor) in shown.into_iter().enumerate() {
        let last = i + 1 == count && hidden == 0;
        let branch = if last { r.glyphs.last_branch } else { r.glyphs.branch };
        let pairs = port_pairs(r.graph, id, neighbor);
        let mut line = format!(
            "    {}{}{}",
            r.marker(r.is_focused(neighbor)),
            branch,
            r.name(neighbor)
        );
        if let Some((mine, theirs)) = pairs
            .first()
            .filter(|(m, t)| !(m.is_empty() && t.is_empty()))
        {
            let _ = write!(line, " ({}{}{})", port(mine), r.glyphs.link, port(theirs));
        }
        if pairs.len() > 1 {
            let _ = write!(line, " x{}", pairs.len());
        }
        r.push(line);
    }
    if hidden > 0 {
        let line = format!(
            "    {}{}+{} more",
            r.marker(false),
            r.glyphs.last_branch,
            hidden
        );
        r.push(line);
    }
}

/// Render the sorted, de-duplicated edge list.
pub fn render_edges(graph: &TopologyGraph, opts: &RenderOptions) -> String {
    if graph.is_empty() {
        return format!("{EMPTY_GRAPH}\n");
    }
    let mut r = Renderer::new(graph, opts);

    // (sort name, id, port) per end, smaller end first
    type End<'g> = (String, &'g str, &'g str);
    let mut rows: BTreeSet<(End<'_>, End<'_>)> = BTreeSet::new();
    for edge in &graph.edges {
        let a: End<'_> = (
            r.name(&edge.from).to_lowercase(),
            edge.from.as_str(),
            edge.local_port.as_str(),
        );
        let b: End<'_> = (
            r.name(&edge.to).to_lowercase(),
            edge.to.as_str(),
            edge.remote_port.as_str(),
        );
        rows.insert(if b < a { (b, a) } else { (a, b) });
    }

    if rows.is_empty() {
        r.push("(no links)".to_string());
    }
    for ((_, a, pa), (_, b, pb)) in &rows {
        let highlighted = r.is_focused(a) || r.is_focused(b);
        let line = format!(
            "{}{}:{} {} {}:{}",
            r.marker(highlighted),
            r.name(a),
            port(pa),
            r.glyphs.link,
            r.name(b),
            port(pb)
        );
        r.push(line);
    }
    r.finish()
}

/// Render one line per node: link count and a short neighbor preview.
pub fn render_flat(graph: &TopologyGraph, opts: &RenderOptions) -> String {
    if graph.is_empty() {
        return format!("{EMPTY_GRAPH}\n");
    }
    let adjacency = adjacency(graph);
    let degrees = degrees(graph);
    let mut r = Renderer::new(graph, opts);

    for node in sorted_nodes(graph) {
        let id = node.id.as_str();
        let links = degrees.get(id).copied().unwrap_or(0);
        let mut line = format!(
            "{}{}{} [{} link{}]",
            r.marker(r.is_focused(id)),
            node.display_name,
            node_tags(node),
            links,
            if links == 1 { "" } else { "s" }
        );

        let mut neighbors: Vec<&str> = adjacency
            .get(id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        neighbors.sort_by_key(|n| (r.name(n).to_lowercase(), n.to_string()));
        if !neighbors.is_empty() {
            let preview: Vec<&str> = neighbors
                .iter()
                .take(MAX_NEIGHBOR_HINTS)
                .map(|n| r.name(n))
                .collect();
            let _ = write!(line, ": {}", preview.join(", "));
            if neighbors.len() > MAX_NEIGHBOR_HINTS {
                let _ = write!(line, " +{} more", neighbors.len() - MAX_NEIGHBOR_HINTS);
            }
        }
        r.push(line);
    }
    r.finish()
}
