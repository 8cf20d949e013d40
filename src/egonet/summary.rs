use rustc_hash::{FxHashMap, FxHashSet};

use super::counter::Counter;
use crate::storage::Graph;
use crate::types::{NodeId, Result};

/// Per-node link multiplicities: distinct neighbor to number of parallel links.
#[derive(Clone, Debug, Default)]
pub struct LinkSummary {
    /// Source node to number of links arriving from it.
    pub in_links: Counter<NodeId>,
    /// Destination node to number of links leaving towards it.
    pub out_links: Counter<NodeId>,
    /// Total incoming links.
    pub total_in: usize,
    /// Total outgoing links.
    pub total_out: usize,
}

impl LinkSummary {
    /// Summarizes the adjacency of `id`. Unknown nodes yield an empty summary.
    pub fn of(graph: &Graph, id: NodeId) -> Self {
        let mut summary = Self::default();
        let Some(node) = graph.node(id) else {
            return summary;
        };
        for link in node.in_links().iter().filter_map(|l| graph.link(*l)) {
            summary.in_links.increment(link.src(), 1.0);
            summary.total_in += 1;
        }
        for link in node.out_links().iter().filter_map(|l| graph.link(*l)) {
            summary.out_links.increment(link.dst(), 1.0);
            summary.total_out += 1;
        }
        summary
    }
}

/// Where an aggregated attribute is read from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttrSource {
    /// Attribute of each link; parallel links each contribute.
    Edge,
    /// Attribute of the neighbor node; each distinct neighbor contributes once.
    Vertex,
}

/// Attribute-weighted counterpart of [`LinkSummary`].
#[derive(Clone, Debug, Default)]
pub struct AttrSummary {
    /// Source node to summed attribute over incoming links.
    pub in_attr: Counter<NodeId>,
    /// Destination node to summed attribute over outgoing links.
    pub out_attr: Counter<NodeId>,
    /// Summed attribute over all incoming links.
    pub total_in: f64,
    /// Summed attribute over all outgoing links.
    pub total_out: f64,
}

impl AttrSummary {
    /// Sums `attr` around `id`. Missing attributes contribute zero.
    pub fn of(graph: &Graph, id: NodeId, attr: &str, source: AttrSource) -> Result<Self> {
        let mut summary = Self::default();
        let Some(node) = graph.node(id) else {
            return Ok(summary);
        };
        let mut seen = FxHashSet::default();
        for link in node.in_links().iter().filter_map(|l| graph.link(*l)) {
            let x = match source {
                AttrSource::Edge => link.number(attr)?,
                AttrSource::Vertex => {
                    if !seen.insert(link.src()) {
                        continue;
                    }
                    vertex_value(graph, link.src(), attr)?
                }
            };
            summary.in_attr.increment(link.src(), x);
            summary.total_in += x;
        }
        seen.clear();
        for link in node.out_links().iter().filter_map(|l| graph.link(*l)) {
            let x = match source {
                AttrSource::Edge => link.number(attr)?,
                AttrSource::Vertex => {
                    if !seen.insert(link.dst()) {
                        continue;
                    }
                    vertex_value(graph, link.dst(), attr)?
                }
            };
            summary.out_attr.increment(link.dst(), x);
            summary.total_out += x;
        }
        Ok(summary)
    }
}

fn vertex_value(graph: &Graph, id: NodeId, attr: &str) -> Result<f64> {
    match graph.node(id) {
        Some(node) => node.number(attr),
        None => Ok(0.0),
    }
}

/// Neighbor summaries for a set of nodes, plus attribute-weighted tables.
///
/// Built once and then only read; egonets borrow it instead of rescanning
/// adjacency for every query.
#[derive(Clone, Debug, Default)]
pub struct Summaries {
    links: FxHashMap<NodeId, LinkSummary>,
    attrs: FxHashMap<String, FxHashMap<NodeId, AttrSummary>>,
}

impl Summaries {
    /// Empty summary set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Link summaries for every node of `graph`.
    pub fn for_graph(graph: &Graph) -> Self {
        let mut summaries = Self::new();
        for node in graph.nodes() {
            summaries.insert_node(graph, node.id());
        }
        summaries
    }

    /// Computes the link summary of `id` unless it is already present.
    pub fn insert_node(&mut self, graph: &Graph, id: NodeId) {
        self.links
            .entry(id)
            .or_insert_with(|| LinkSummary::of(graph, id));
    }

    /// Computes `attr` summaries for `nodes`, skipping ones already present.
    pub fn insert_attr<I>(
        &mut self,
        graph: &Graph,
        nodes: I,
        attr: &str,
        source: AttrSource,
    ) -> Result<()>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let table = self.attrs.entry(attr.to_string()).or_default();
        for id in nodes {
            if table.contains_key(&id) {
                continue;
            }
            table.insert(id, AttrSummary::of(graph, id, attr, source)?);
        }
        Ok(())
    }

    /// Link summary of `id`, if computed.
    pub fn links(&self, id: NodeId) -> Option<&LinkSummary> {
        self.links.get(&id)
    }

    /// Attribute summary of `id` for `attr`, if computed.
    pub fn attr(&self, attr: &str, id: NodeId) -> Option<&AttrSummary> {
        self.attrs.get(attr).and_then(|table| table.get(&id))
    }

    /// Number of nodes with a link summary.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no node has been summarized.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AttrValue, Attrs};

    fn weighted(w: f64) -> Attrs {
        let mut attrs = Attrs::new();
        attrs.insert("wgt".into(), AttrValue::Num(w));
        attrs
    }

    #[test]
    fn parallel_links_accumulate_multiplicity() {
        let mut graph = Graph::new();
        graph.add_link(NodeId(0), NodeId(1), None);
        graph.add_link(NodeId(0), NodeId(1), None);
        graph.add_link(NodeId(2), NodeId(1), None);
        let summary = LinkSummary::of(&graph, NodeId(1));
        assert_eq!(summary.in_links.get(&NodeId(0)), 2.0);
        assert_eq!(summary.in_links.len(), 2);
        assert_eq!(summary.total_in, 3);
        assert_eq!(summary.total_out, 0);
    }

    #[test]
    fn edge_weights_sum_per_neighbor() {
        let mut graph = Graph::new();
        graph.add_link(NodeId(0), NodeId(1), Some(&weighted(1.5)));
        graph.add_link(NodeId(0), NodeId(1), Some(&weighted(2.0)));
        graph.add_link(NodeId(0), NodeId(2), None);
        let summary = AttrSummary::of(&graph, NodeId(0), "wgt", AttrSource::Edge).unwrap();
        assert_eq!(summary.out_attr.get(&NodeId(1)), 3.5);
        assert_eq!(summary.out_attr.get(&NodeId(2)), 0.0);
        assert_eq!(summary.total_out, 3.5);
    }

    #[test]
    fn vertex_attributes_count_each_neighbor_once() {
        let mut graph = Graph::new();
        graph.add_link(NodeId(0), NodeId(1), None);
        graph.add_link(NodeId(0), NodeId(1), None);
        graph.set_node_attr(NodeId(1), "score", 5.0).unwrap();
        let summary = AttrSummary::of(&graph, NodeId(0), "score", AttrSource::Vertex).unwrap();
        assert_eq!(summary.out_attr.get(&NodeId(1)), 5.0);
        assert_eq!(summary.total_out, 5.0);
    }

    #[test]
    fn non_numeric_weight_is_rejected() {
        let mut graph = Graph::new();
        let mut attrs = Attrs::new();
        attrs.insert("wgt".into(), AttrValue::from("heavy"));
        graph.add_link(NodeId(0), NodeId(1), Some(&attrs));
        assert!(AttrSummary::of(&graph, NodeId(0), "wgt", AttrSource::Edge).is_err());
    }
}
