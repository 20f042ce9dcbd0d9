//! Graph assembly, layout and rendering.

pub mod builder;
pub mod layout;
pub mod model;
pub mod render;

pub use builder::build_graph;
pub use layout::{Layout, MAX_LAYER, compute_layout, degrees, select_spines, spine_count};
pub use model::{NodeKind, TopologyEdge, TopologyGraph, TopologyNode};
pub use render::{MAX_NEIGHBOR_HINTS, RenderOptions, render_edges, render_flat, render_layered};
