use std::cmp::Ordering;

use super::binning::{BinTable, TIE_TOLERANCE};
use super::metrics::PruneMetrics;
use crate::storage::Graph;
use crate::types::{NodeId, Result};

/// Precomputed tie-break key of one feature name.
///
/// Fewer `-` segments win, then a name without the raw `-wn0-` node-count
/// tag, then the shorter name, then byte order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct RepKey {
    segments: usize,
    node_count: bool,
    len: usize,
    name: String,
}

impl RepKey {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            segments: name.split('-').count(),
            node_count: name.contains("-wn0-"),
            len: name.len(),
            name: name.to_string(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

/// Union-find over feature slots. Slots are ordered by preference, so the
/// smaller root always becomes the representative.
#[derive(Debug)]
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    pub(crate) fn find(&mut self, slot: usize) -> usize {
        let mut root = slot;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = slot;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    pub(crate) fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        match ra.cmp(&rb) {
            Ordering::Less => self.parent[rb] = ra,
            Ordering::Greater => self.parent[ra] = rb,
            Ordering::Equal => {}
        }
    }

    pub(crate) fn is_root(&mut self, slot: usize) -> bool {
        self.find(slot) == slot
    }
}

fn bin_value(graph: &Graph, id: NodeId, attr: &str) -> Result<f64> {
    match graph.node(id) {
        Some(node) => node.number(attr),
        None => Ok(0.0),
    }
}

/// Checks every node in `nodes` for a bin gap between `a` and `b` larger
/// than `max_dist`. Returns `false` on the first violation.
fn within_dist(
    graph: &Graph,
    nodes: &[NodeId],
    a: &str,
    b: &str,
    max_dist: f64,
    metrics: &dyn PruneMetrics,
) -> Result<bool> {
    metrics.nodes_checked(nodes.len() as u64);
    for &id in nodes {
        let diff = (bin_value(graph, id, a)? - bin_value(graph, id, b)?).abs();
        if diff > max_dist && diff - max_dist > TIE_TOLERANCE {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Whether binned features `a` and `b` order the nodes alike.
///
/// Walks bins from the top down and compares every node holding a bin
/// above `max_dist` in either feature. Nodes binned at or below `max_dist`
/// in both are never inspected.
pub(crate) fn orders_agree(
    graph: &Graph,
    (a, bins_a): (&str, &BinTable),
    (b, bins_b): (&str, &BinTable),
    max_dist: u32,
    metrics: &dyn PruneMetrics,
) -> Result<bool> {
    let limit = f64::from(max_dist);
    let mut index_a = bins_a.max_bin();
    let mut index_b = bins_b.max_bin();

    while index_a > index_b && index_a > max_dist {
        if !within_dist(graph, bins_a.bin(index_a), a, b, limit, metrics)? {
            return Ok(false);
        }
        index_a -= 1;
    }
    while index_b > index_a && index_b > max_dist {
        if !within_dist(graph, bins_b.bin(index_b), b, a, limit, metrics)? {
            return Ok(false);
        }
        index_b -= 1;
    }
    let mut index = index_a;
    while index > max_dist {
        if !within_dist(graph, bins_a.bin(index), a, b, limit, metrics)?
            || !within_dist(graph, bins_b.bin(index), b, a, limit, metrics)?
        {
            return Ok(false);
        }
        index -= 1;
    }
    Ok(true)
}
