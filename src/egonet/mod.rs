//! Egonets: the nodes reachable from a set of centers within a hop bound,
//! and the internal/boundary link counts of that neighborhood.

mod counter;
mod counts;
mod generator;
mod summary;

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;
use tracing::trace;

pub use counter::{Counter, TOLERANCE};
pub use counts::{
    dest_attr, external_attr, source_attr, within_attr, EgonetCounts, WEU, WET, WN, XEDT, XEDU,
    XEST, XESU, XET, XEU,
};
pub use generator::{EdgeFilter, EgonetGenerator, GeneratorOptions};
pub use summary::{AttrSource, AttrSummary, LinkSummary, Summaries};

use crate::storage::{Dir, ExpandOpts, Graph};
use crate::types::{NodeId, Result};

/// Neighborhood of one or more centers in a graph.
///
/// Centers unknown to the graph are members with no links. Link
/// summaries come from a shared [`Summaries`] when one is supplied and are
/// computed locally for any member it does not cover.
#[derive(Debug)]
pub struct Egonet<'g> {
    graph: &'g Graph,
    dir: Dir,
    nodes: BTreeSet<NodeId>,
    shared: Option<&'g Summaries>,
    local: Summaries,
}

impl<'g> Egonet<'g> {
    /// Expands `hops` steps from `centers` along links selected by `dir`.
    pub fn new<I>(graph: &'g Graph, centers: I, hops: usize, dir: Dir) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self::with_summaries(graph, centers, hops, dir, None)
    }

    /// Like [`Egonet::new`], reading link and attribute summaries from `shared`.
    pub fn with_summaries<I>(
        graph: &'g Graph,
        centers: I,
        hops: usize,
        dir: Dir,
        shared: Option<&'g Summaries>,
    ) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut nodes: BTreeSet<NodeId> = centers.into_iter().collect();
        let mut closed = FxHashSet::default();
        for _ in 0..hops {
            let frontier: Vec<NodeId> = nodes
                .iter()
                .copied()
                .filter(|id| !closed.contains(id))
                .collect();
            if frontier.is_empty() {
                break;
            }
            for id in frontier {
                let opts = ExpandOpts {
                    distinct_nodes: true,
                };
                nodes.extend(graph.neighbors(id, dir, opts).into_iter().map(|n| n.neighbor));
                closed.insert(id);
            }
        }

        trace!(
            dir = dir.as_str(),
            hops,
            nodes = nodes.len(),
            "egonet.expanded"
        );
        let mut local = Summaries::new();
        for &id in &nodes {
            if shared.and_then(|s| s.links(id)).is_none() {
                local.insert_node(graph, id);
            }
        }
        Self {
            graph,
            dir,
            nodes,
            shared,
            local,
        }
    }

    /// Member nodes in ascending order.
    pub fn nodes(&self) -> &BTreeSet<NodeId> {
        &self.nodes
    }

    /// Number of member nodes.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Direction the expansion followed.
    pub fn dir(&self) -> Dir {
        self.dir
    }

    fn link_summary(&self, id: NodeId) -> Option<&LinkSummary> {
        self.shared
            .and_then(|s| s.links(id))
            .or_else(|| self.local.links(id))
    }

    fn attr_summary<'a>(
        &'a self,
        scratch: &'a Summaries,
        attr: &str,
        id: NodeId,
    ) -> Option<&'a AttrSummary> {
        self.shared
            .and_then(|s| s.attr(attr, id))
            .or_else(|| scratch.attr(attr, id))
    }

    /// Internal and boundary counts, plus per-attribute sums for `attrs`.
    ///
    /// Attributes without a shared summary are read from links. For each
    /// member the cheaper of two scans is used: its distinct neighbors when
    /// there are fewer of them than members, otherwise the members, after
    /// first booking every neighbor as external.
    pub fn counts(&self, attrs: &[&str]) -> Result<EgonetCounts> {
        let mut scratch = Summaries::new();
        for attr in attrs {
            let missing: Vec<NodeId> = self
                .nodes
                .iter()
                .copied()
                .filter(|id| self.shared.and_then(|s| s.attr(attr, *id)).is_none())
                .collect();
            if !missing.is_empty() {
                scratch.insert_attr(self.graph, missing, attr, AttrSource::Edge)?;
            }
        }

        let keys: Vec<[String; 3]> = attrs
            .iter()
            .map(|attr| [within_attr(attr), source_attr(attr), dest_attr(attr)])
            .collect();
        let empty_links = LinkSummary::default();
        let empty_attr = AttrSummary::default();
        let size = self.nodes.len();
        let mut tally: Counter<&str> = Counter::new();

        for &n1 in &self.nodes {
            tally.increment(WN, 1.0);
            let links = self.link_summary(n1).unwrap_or(&empty_links);
            let sums: Vec<&AttrSummary> = attrs
                .iter()
                .map(|attr| self.attr_summary(&scratch, attr, n1).unwrap_or(&empty_attr))
                .collect();

            if links.in_links.len() < size {
                for (n2, count) in links.in_links.iter() {
                    if self.nodes.contains(n2) {
                        tally.increment(WEU, 1.0);
                        tally.increment(WET, count);
                        for ([within, _, _], sum) in keys.iter().zip(&sums) {
                            tally.increment(within.as_str(), sum.in_attr.get(n2));
                        }
                    } else {
                        tally.increment(XEDU, 1.0);
                        tally.increment(XEDT, count);
                        for ([_, _, dest], sum) in keys.iter().zip(&sums) {
                            tally.increment(dest.as_str(), sum.in_attr.get(n2));
                        }
                    }
                }
            } else {
                tally.increment(XEDU, links.in_links.len() as f64);
                tally.increment(XEDT, links.total_in as f64);
                for ([_, _, dest], sum) in keys.iter().zip(&sums) {
                    tally.increment(dest.as_str(), sum.total_in);
                }
                for n2 in &self.nodes {
                    if !links.in_links.contains_key(n2) {
                        continue;
                    }
                    let count = links.in_links.get(n2);
                    tally.increment(WEU, 1.0);
                    tally.increment(WET, count);
                    tally.decrement(XEDU, 1.0);
                    tally.decrement(XEDT, count);
                    for ([within, _, dest], sum) in keys.iter().zip(&sums) {
                        let x = sum.in_attr.get(n2);
                        tally.increment(within.as_str(), x);
                        tally.decrement(dest.as_str(), x);
                    }
                }
            }

            // Internal out-links were already booked from the other end.
            if links.out_links.len() < size {
                for (n2, count) in links.out_links.iter() {
                    if self.nodes.contains(n2) {
                        continue;
                    }
                    tally.increment(XESU, 1.0);
                    tally.increment(XEST, count);
                    for ([_, source, _], sum) in keys.iter().zip(&sums) {
                        tally.increment(source.as_str(), sum.out_attr.get(n2));
                    }
                }
            } else {
                tally.increment(XESU, links.out_links.len() as f64);
                tally.increment(XEST, links.total_out as f64);
                for ([_, source, _], sum) in keys.iter().zip(&sums) {
                    tally.increment(source.as_str(), sum.total_out);
                }
                for n2 in &self.nodes {
                    if !links.out_links.contains_key(n2) {
                        continue;
                    }
                    tally.decrement(XESU, 1.0);
                    tally.decrement(XEST, links.out_links.get(n2));
                    for ([_, source, _], sum) in keys.iter().zip(&sums) {
                        tally.decrement(source.as_str(), sum.out_attr.get(n2));
                    }
                }
            }
        }

        let mut counts = EgonetCounts::zeroed(attrs);
        for (code, value) in tally.iter() {
            counts.set(code, value);
        }
        counts.finish(attrs);
        Ok(counts)
    }

    /// Exact number of distinct non-members adjacent to any member, in
    /// either direction.
    pub fn num_external_nodes(&self) -> usize {
        let mut external = BTreeSet::new();
        for &id in &self.nodes {
            external.extend(self.graph.unique_neighbors(id));
        }
        external.difference(&self.nodes).count()
    }
}
