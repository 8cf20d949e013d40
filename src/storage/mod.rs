//! Attributed graph store.
//!
//! Holds nodes, links and their attribute mappings, and answers identifier
//! and attribute-value lookups, optionally backed by per-attribute indices.

mod adjacency;
mod graph;
mod index;
mod value;


/// Traversal direction and neighbor records.
pub use adjacency::{Dir, ExpandOpts, Neighbor};

/// Graph container, nodes and links.
pub use graph::{Graph, Link, Node};

/// Attribute values.
pub use value::{number_or_zero, AttrValue, Attrs};
