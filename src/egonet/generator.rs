use std::borrow::Cow;
use std::time::Instant;

use tracing::debug;

use super::counts::EgonetCounts;
use super::summary::{AttrSource, Summaries};
use super::Egonet;
use crate::storage::{AttrValue, Dir, Graph, Link};
use crate::types::{NodeId, Result};

/// Accepts a link whose attribute `attr` equals `value`.
///
/// A `None` value accepts links that do not carry `attr` at all.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeFilter {
    /// Attribute name to test.
    pub attr: String,
    /// Required value, or `None` for "absent".
    pub value: Option<AttrValue>,
}

impl EdgeFilter {
    /// Filter on equality with `value`.
    pub fn new(attr: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self {
            attr: attr.into(),
            value: Some(value.into()),
        }
    }

    /// Filter accepting links that lack `attr`.
    pub fn missing(attr: impl Into<String>) -> Self {
        Self {
            attr: attr.into(),
            value: None,
        }
    }

    /// Whether `link` passes.
    pub fn matches(&self, link: &Link) -> bool {
        link.attr(&self.attr) == self.value.as_ref()
    }
}

/// What an [`EgonetGenerator`] precomputes.
#[derive(Clone, Debug, Default)]
pub struct GeneratorOptions {
    /// Links are kept if any filter accepts them. Empty keeps every link.
    pub filters: Vec<EdgeFilter>,
    /// Link attributes summed per neighbor.
    pub edge_attrs: Vec<String>,
    /// Node attributes summed once per distinct neighbor.
    pub vertex_attrs: Vec<String>,
}

impl GeneratorOptions {
    /// Options with no filters and no tracked attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an edge filter.
    pub fn filter(mut self, filter: EdgeFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Tracks a link attribute.
    pub fn edge_attr(mut self, attr: impl Into<String>) -> Self {
        self.edge_attrs.push(attr.into());
        self
    }

    /// Tracks a node attribute.
    pub fn vertex_attr(mut self, attr: impl Into<String>) -> Self {
        self.vertex_attrs.push(attr.into());
        self
    }

    /// Tracks every node attribute in `attrs`.
    pub fn vertex_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vertex_attrs.extend(attrs.into_iter().map(Into::into));
        self
    }
}

/// Builds egonets over one graph from summaries computed once.
///
/// With filters, the generator owns a copy of the graph holding only the
/// accepted links; centers missing from that copy behave as isolated nodes.
/// If a name is tracked both as a link and as a node attribute, the link
/// summary is kept.
#[derive(Debug)]
pub struct EgonetGenerator<'g> {
    graph: Cow<'g, Graph>,
    summaries: Summaries,
    tracked: Vec<String>,
}

impl<'g> EgonetGenerator<'g> {
    /// Applies the filters and summarizes every node of the resulting graph.
    pub fn new(graph: &'g Graph, opts: &GeneratorOptions) -> Result<Self> {
        let started = Instant::now();
        let graph = if opts.filters.is_empty() {
            Cow::Borrowed(graph)
        } else {
            Cow::Owned(graph.filter_links(|link| opts.filters.iter().any(|f| f.matches(link)))?)
        };

        let mut summaries = Summaries::for_graph(&graph);
        let ids = graph.node_ids();
        let mut tracked = Vec::new();
        for attr in &opts.edge_attrs {
            summaries.insert_attr(&graph, ids.iter().copied(), attr, AttrSource::Edge)?;
            tracked.push(attr.clone());
        }
        for attr in &opts.vertex_attrs {
            summaries.insert_attr(&graph, ids.iter().copied(), attr, AttrSource::Vertex)?;
            if !tracked.contains(attr) {
                tracked.push(attr.clone());
            }
        }

        debug!(
            nodes = graph.node_count(),
            links = graph.link_count(),
            filtered = !opts.filters.is_empty(),
            attrs = tracked.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "egonet.generator.built"
        );
        Ok(Self {
            graph,
            summaries,
            tracked,
        })
    }

    /// Generator over `graph` with no filters and no tracked attributes.
    pub fn unfiltered(graph: &'g Graph) -> Self {
        Self {
            summaries: Summaries::for_graph(graph),
            graph: Cow::Borrowed(graph),
            tracked: Vec::new(),
        }
    }

    /// The graph egonets are built over, filtered if filters were given.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Tracked attribute names, link attributes first.
    pub fn tracked_attrs(&self) -> &[String] {
        &self.tracked
    }

    /// The precomputed summaries.
    pub fn summaries(&self) -> &Summaries {
        &self.summaries
    }

    /// Egonet around `centers`.
    pub fn egonet(&self, centers: &[NodeId], hops: usize, dir: Dir) -> Egonet<'_> {
        Egonet::with_summaries(
            &self.graph,
            centers.iter().copied(),
            hops,
            dir,
            Some(&self.summaries),
        )
    }

    fn counts_in(&self, centers: &[NodeId], hops: usize, dir: Dir) -> Result<EgonetCounts> {
        let attrs: Vec<&str> = self.tracked.iter().map(String::as_str).collect();
        self.egonet(centers, hops, dir).counts(&attrs)
    }

    /// Counts of the bidirectional egonet, with every tracked attribute.
    pub fn counts(&self, centers: &[NodeId], hops: usize) -> Result<EgonetCounts> {
        self.counts_in(centers, hops, Dir::Both)
    }

    /// Counts of the egonet expanded along incoming links only.
    pub fn in_counts(&self, centers: &[NodeId], hops: usize) -> Result<EgonetCounts> {
        self.counts_in(centers, hops, Dir::In)
    }

    /// Counts of the egonet expanded along outgoing links only.
    pub fn out_counts(&self, centers: &[NodeId], hops: usize) -> Result<EgonetCounts> {
        self.counts_in(centers, hops, Dir::Out)
    }

    /// Exact external node count of the bidirectional egonet.
    pub fn external_nodes(&self, centers: &[NodeId], hops: usize) -> usize {
        self.egonet(centers, hops, Dir::Both).num_external_nodes()
    }

    /// Exact external node count of the egonet expanded along `dir`.
    pub fn external_nodes_in(&self, centers: &[NodeId], hops: usize, dir: Dir) -> usize {
        self.egonet(centers, hops, dir).num_external_nodes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Attrs;

    fn typed(kind: &str) -> Attrs {
        let mut attrs = Attrs::new();
        attrs.insert("type".into(), AttrValue::from(kind));
        attrs.insert("wgt".into(), AttrValue::Num(2.0));
        attrs
    }

    #[test]
    fn filters_are_an_or_of_equalities() {
        let mut graph = Graph::new();
        graph.add_link(NodeId(0), NodeId(1), Some(&typed("call")));
        graph.add_link(NodeId(0), NodeId(2), Some(&typed("mail")));
        graph.add_link(NodeId(0), NodeId(3), Some(&typed("visit")));
        graph.add_link(NodeId(0), NodeId(4), None);

        let opts = GeneratorOptions::new()
            .filter(EdgeFilter::new("type", "call"))
            .filter(EdgeFilter::new("type", "mail"))
            .edge_attr("wgt");
        let generator = EgonetGenerator::new(&graph, &opts).unwrap();
        assert_eq!(generator.graph().link_count(), 2);

        let counts = generator.counts(&[NodeId(0)], 0).unwrap();
        assert_eq!(counts.get("xesu"), 2.0);
        assert_eq!(counts.get("xesa-wgt"), 4.0);

        let missing = GeneratorOptions::new().filter(EdgeFilter::missing("type"));
        let generator = EgonetGenerator::new(&graph, &missing).unwrap();
        assert_eq!(generator.graph().node_ids(), vec![NodeId(0), NodeId(4)]);
    }

    #[test]
    fn filtered_out_center_is_isolated() {
        let mut graph = Graph::new();
        graph.add_link(NodeId(0), NodeId(1), Some(&typed("call")));
        graph.add_link(NodeId(2), NodeId(3), Some(&typed("mail")));
        let opts = GeneratorOptions::new().filter(EdgeFilter::new("type", "call"));
        let generator = EgonetGenerator::new(&graph, &opts).unwrap();
        let counts = generator.counts(&[NodeId(2)], 1).unwrap();
        assert_eq!(counts.get("wn"), 1.0);
        assert_eq!(counts.get("xet"), 0.0);
    }

    #[test]
    fn vertex_attributes_aggregate_neighbors() {
        let mut graph = Graph::new();
        graph.add_link(NodeId(0), NodeId(1), None);
        graph.add_link(NodeId(0), NodeId(1), None);
        graph.add_link(NodeId(2), NodeId(0), None);
        graph.set_node_attr(NodeId(1), "score", 3.0).unwrap();
        graph.set_node_attr(NodeId(2), "score", 5.0).unwrap();

        let opts = GeneratorOptions::new().vertex_attr("score");
        let generator = EgonetGenerator::new(&graph, &opts).unwrap();
        assert_eq!(generator.tracked_attrs(), ["score".to_string()]);
        let counts = generator.counts(&[NodeId(0)], 0).unwrap();
        assert_eq!(counts.get("xesa-score"), 3.0);
        assert_eq!(counts.get("xeda-score"), 5.0);
        assert_eq!(counts.get("xea-score"), 8.0);
    }

    #[test]
    fn directional_counts_and_external_nodes() {
        let mut graph = Graph::new();
        graph.add_link(NodeId(0), NodeId(1), None);
        graph.add_link(NodeId(1), NodeId(2), None);
        graph.add_link(NodeId(3), NodeId(1), None);
        let generator = EgonetGenerator::unfiltered(&graph);

        assert_eq!(generator.out_counts(&[NodeId(1)], 1).unwrap().get("wn"), 2.0);
        assert_eq!(generator.in_counts(&[NodeId(1)], 1).unwrap().get("wn"), 3.0);
        assert_eq!(generator.counts(&[NodeId(1)], 1).unwrap().get("wn"), 4.0);
        assert_eq!(generator.external_nodes(&[NodeId(1)], 0), 3);
        assert_eq!(generator.external_nodes_in(&[NodeId(1)], 1, Dir::Out), 2);
    }
}
