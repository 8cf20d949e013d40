use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::adjacency::{Dir, ExpandOpts, Neighbor};
use super::index::NodeIndexes;
use super::value::{number_or_zero, AttrValue, Attrs};
use crate::types::{LinkId, NodeId, Result, RoleError};

/// A node together with its attributes and adjacency.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    attrs: Attrs,
    in_links: BTreeSet<LinkId>,
    out_links: BTreeSet<LinkId>,
    self_loops: usize,
    retained: bool,
}

impl Node {
    fn new(id: NodeId, retained: bool) -> Self {
        Self {
            id,
            attrs: Attrs::new(),
            in_links: BTreeSet::new(),
            out_links: BTreeSet::new(),
            self_loops: 0,
            retained,
        }
    }

    /// Node identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// All attributes of the node.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Single attribute lookup.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Numeric attribute, zero when absent.
    pub fn number(&self, name: &str) -> Result<f64> {
        number_or_zero(&self.attrs, name)
    }

    /// Sets an attribute. Indices are not updated; see [`Graph::reindex_node`].
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Incoming links, self-loops included.
    pub fn in_links(&self) -> &BTreeSet<LinkId> {
        &self.in_links
    }

    /// Outgoing links, self-loops included.
    pub fn out_links(&self) -> &BTreeSet<LinkId> {
        &self.out_links
    }

    /// Every adjacent link once, self-loops included.
    pub fn links(&self) -> BTreeSet<LinkId> {
        self.in_links.union(&self.out_links).copied().collect()
    }

    /// Number of incoming links.
    pub fn num_in_links(&self) -> usize {
        self.in_links.len()
    }

    /// Number of outgoing links.
    pub fn num_out_links(&self) -> usize {
        self.out_links.len()
    }

    /// Number of distinct adjacent links; a self-loop counts once.
    pub fn num_adjacent_links(&self) -> usize {
        self.in_links.len() + self.out_links.len() - self.self_loops
    }

    /// Number of self-loops on this node.
    pub fn self_loop_count(&self) -> usize {
        self.self_loops
    }

    /// Whether the node was created explicitly and survives losing its links.
    pub fn is_retained(&self) -> bool {
        self.retained
    }
}

/// A directed link with a private attribute copy.
#[derive(Clone, Debug)]
pub struct Link {
    id: LinkId,
    src: NodeId,
    dst: NodeId,
    attrs: Attrs,
}

impl Link {
    /// Link identifier.
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Source endpoint.
    pub fn src(&self) -> NodeId {
        self.src
    }

    /// Destination endpoint.
    pub fn dst(&self) -> NodeId {
        self.dst
    }

    /// Whether source and destination coincide.
    pub fn is_self_loop(&self) -> bool {
        self.src == self.dst
    }

    /// The endpoint opposite `node`; for a self-loop this is `node` itself.
    pub fn other(&self, node: NodeId) -> NodeId {
        if self.src == node {
            self.dst
        } else {
            self.src
        }
    }

    /// All attributes of the link.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Single attribute lookup.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Numeric attribute, zero when absent.
    pub fn number(&self, name: &str) -> Result<f64> {
        number_or_zero(&self.attrs, name)
    }

    /// Sets an attribute on this link.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(name.into(), value.into());
    }
}

/// In-memory attributed directed multigraph.
///
/// Nodes created explicitly through [`Graph::add_node`] or
/// [`Graph::add_node_with_id`] persist even with no links. Nodes that only
/// came into existence as link endpoints are dropped as soon as their last
/// link is removed.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    links: BTreeMap<LinkId, Link>,
    next_node_id: u64,
    node_ids_exhausted: bool,
    next_link_id: u64,
    indexes: NodeIndexes,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Node ids in ascending order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Links in ascending id order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable node access for attribute updates.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Whether `id` names a node in this graph.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Looks up a link.
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// Mutable link access for attribute updates.
    pub fn link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(&id)
    }

    /// Creates a node with the next free identifier.
    ///
    /// Fails once an identifier of `u64::MAX` has been handed out or
    /// reserved, since no larger one is left.
    pub fn add_node(&mut self) -> Result<NodeId> {
        if self.node_ids_exhausted {
            return Err(RoleError::Invalid("node identifiers exhausted".into()));
        }
        let id = NodeId(self.next_node_id);
        self.reserve(id);
        self.nodes.entry(id).or_insert_with(|| Node::new(id, true));
        Ok(id)
    }

    /// Creates a node with a caller-chosen identifier, or marks an existing
    /// node as explicitly created.
    pub fn add_node_with_id(&mut self, id: NodeId) -> NodeId {
        self.reserve(id);
        self.nodes
            .entry(id)
            .or_insert_with(|| Node::new(id, true))
            .retained = true;
        id
    }

    /// Returns the node with `id`, creating it on demand.
    ///
    /// Nodes created here are implicit: they are pruned once they have had
    /// links and lose all of them.
    pub fn node_or_insert(&mut self, id: NodeId) -> &mut Node {
        self.reserve(id);
        self.nodes.entry(id).or_insert_with(|| Node::new(id, false))
    }

    fn reserve(&mut self, id: NodeId) {
        if self.node_ids_exhausted || id.0 < self.next_node_id {
            return;
        }
        match id.0.checked_add(1) {
            Some(next) => self.next_node_id = next,
            None => self.node_ids_exhausted = true,
        }
    }

    /// Adds a link, creating either endpoint if needed. `None` attributes
    /// become an empty mapping.
    pub fn add_link(&mut self, src: NodeId, dst: NodeId, attrs: Option<&Attrs>) -> LinkId {
        self.node_or_insert(src);
        self.node_or_insert(dst);
        let id = LinkId(self.next_link_id);
        self.next_link_id += 1;
        self.links.insert(
            id,
            Link {
                id,
                src,
                dst,
                attrs: attrs.cloned().unwrap_or_default(),
            },
        );
        if src == dst {
            if let Some(node) = self.nodes.get_mut(&src) {
                node.in_links.insert(id);
                node.out_links.insert(id);
                node.self_loops += 1;
            }
        } else {
            if let Some(node) = self.nodes.get_mut(&src) {
                node.out_links.insert(id);
            }
            if let Some(node) = self.nodes.get_mut(&dst) {
                node.in_links.insert(id);
            }
        }
        id
    }

    /// Copies link `id` of `source` into this graph. Missing endpoints are
    /// created with the attributes they carry in `source`.
    pub fn copy_link(&mut self, source: &Graph, id: LinkId) -> Result<LinkId> {
        let link = source.link(id).ok_or(RoleError::NotFound("link"))?;
        for endpoint in [link.src, link.dst] {
            if !self.nodes.contains_key(&endpoint) {
                let attrs = source
                    .node(endpoint)
                    .map(|node| node.attrs.clone())
                    .unwrap_or_default();
                self.node_or_insert(endpoint).attrs = attrs;
            }
        }
        Ok(self.add_link(link.src, link.dst, Some(&link.attrs)))
    }

    /// Builds a new graph holding only the links accepted by `keep`.
    ///
    /// Nodes of the result are exactly the endpoints of kept links, carrying
    /// copies of their attributes.
    pub fn filter_links<F>(&self, mut keep: F) -> Result<Graph>
    where
        F: FnMut(&Link) -> bool,
    {
        let mut filtered = Graph::new();
        for link in self.links.values() {
            if keep(link) {
                filtered.copy_link(self, link.id)?;
            }
        }
        Ok(filtered)
    }

    /// Removes a link and prunes any implicit endpoint left without links.
    pub fn remove_link(&mut self, id: LinkId) -> Result<Link> {
        let link = self.links.remove(&id).ok_or(RoleError::NotFound("link"))?;
        if link.src == link.dst {
            if let Some(node) = self.nodes.get_mut(&link.src) {
                node.in_links.remove(&id);
                node.out_links.remove(&id);
                node.self_loops -= 1;
            }
        } else {
            if let Some(node) = self.nodes.get_mut(&link.src) {
                node.out_links.remove(&id);
            }
            if let Some(node) = self.nodes.get_mut(&link.dst) {
                node.in_links.remove(&id);
            }
            self.prune_if_isolated(link.dst);
        }
        self.prune_if_isolated(link.src);
        Ok(link)
    }

    fn prune_if_isolated(&mut self, id: NodeId) {
        let isolated = self
            .nodes
            .get(&id)
            .is_some_and(|node| !node.retained && node.num_adjacent_links() == 0);
        if isolated {
            self.nodes.remove(&id);
            self.indexes.forget(id);
            debug!(node = id.0, "storage.node.pruned");
        }
    }

    /// Neighbors of `id` across links selected by `dir`.
    ///
    /// With [`Dir::Both`] a self-loop is reported once. Parallel links yield
    /// one entry each unless `opts.distinct_nodes` is set.
    pub fn neighbors(&self, id: NodeId, dir: Dir, opts: ExpandOpts) -> Vec<Neighbor> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let link_ids: Vec<LinkId> = match dir {
            Dir::Out => node.out_links.iter().copied().collect(),
            Dir::In => node.in_links.iter().copied().collect(),
            Dir::Both => node.links().into_iter().collect(),
        };
        let mut seen = BTreeSet::new();
        let mut out = Vec::with_capacity(link_ids.len());
        for link_id in link_ids {
            let Some(link) = self.links.get(&link_id) else {
                continue;
            };
            let neighbor = match dir {
                Dir::Out => link.dst,
                Dir::In => link.src,
                Dir::Both => link.other(id),
            };
            if opts.distinct_nodes && !seen.insert(neighbor) {
                continue;
            }
            out.push(Neighbor {
                neighbor,
                link: link_id,
            });
        }
        out
    }

    /// Distinct nodes adjacent to `id` in either direction.
    pub fn unique_neighbors(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.neighbors(id, Dir::Both, ExpandOpts::default())
            .into_iter()
            .map(|n| n.neighbor)
            .collect()
    }

    /// Number of distinct adjacent nodes.
    pub fn num_adjacent_nodes(&self, id: NodeId) -> usize {
        self.unique_neighbors(id).len()
    }

    /// Sets a node attribute. Indices are left untouched.
    pub fn set_node_attr(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(RoleError::NotFound("node"))?;
        node.set_attr(name, value);
        Ok(())
    }

    /// Nodes whose attribute `attr` equals `value`, by index when one exists
    /// and by scan otherwise.
    pub fn nodes_by_attr(&self, attr: &str, value: &AttrValue) -> Vec<NodeId> {
        if let Some(hits) = self.indexes.lookup(attr, value) {
            return hits;
        }
        self.nodes
            .values()
            .filter(|node| node.attrs.get(attr) == Some(value))
            .map(|node| node.id)
            .collect()
    }

    /// The single node whose `attr` equals `value`.
    ///
    /// Fails with [`RoleError::AmbiguousMatch`] when several nodes match.
    pub fn unique_node_by_attr(&self, attr: &str, value: &AttrValue) -> Result<Option<NodeId>> {
        let hits = self.nodes_by_attr(attr, value);
        match hits.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            _ => Err(RoleError::AmbiguousMatch {
                attr: attr.to_string(),
                value: value.to_string(),
                count: hits.len(),
            }),
        }
    }

    /// Builds (or rebuilds) the index for `attr`.
    pub fn build_index(&mut self, attr: &str) {
        self.indexes
            .build(attr, self.nodes.values().map(|node| (node.id, &node.attrs)));
        debug!(attr, nodes = self.nodes.len(), "storage.index.built");
    }

    /// Drops the index for `attr`; returns whether one existed.
    pub fn drop_index(&mut self, attr: &str) -> bool {
        self.indexes.remove(attr)
    }

    /// Whether `attr` is indexed.
    pub fn has_index(&self, attr: &str) -> bool {
        self.indexes.contains(attr)
    }

    /// Names of all indexed attributes.
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.names().map(str::to_string).collect();
        names.sort();
        names
    }

    /// Re-files `id` in every index under its current attribute values.
    pub fn reindex_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.nodes.get(&id).ok_or(RoleError::NotFound("node"))?;
        self.indexes.refresh(id, &node.attrs);
        Ok(())
    }
}
