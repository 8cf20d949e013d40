use crate::types::{LinkId, NodeId};

/// Which adjacency sets a traversal step consults.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Dir {
    /// Follow outgoing links only.
    Out,
    /// Follow incoming links only.
    In,
    /// Follow links in either direction.
    Both,
}

impl Dir {
    /// Lowercase label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Dir::Out => "out",
            Dir::In => "in",
            Dir::Both => "both",
        }
    }
}

/// Options for [`super::Graph::neighbors`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpandOpts {
    /// Collapse parallel links so each neighbor is reported once.
    pub distinct_nodes: bool,
}

/// One hop across a link.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Neighbor {
    /// Node at the far end of the link.
    pub neighbor: NodeId,
    /// Link that was crossed.
    pub link: LinkId,
}
