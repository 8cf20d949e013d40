use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use super::value::{AttrValue, Attrs, IndexKey};
use crate::types::NodeId;

type Buckets = FxHashMap<IndexKey, BTreeSet<NodeId>>;

/// Named value indices over node attributes.
///
/// Indices are snapshots: attribute writes do not reach them until the caller
/// asks for a re-index of the node.
#[derive(Clone, Debug, Default)]
pub(crate) struct NodeIndexes {
    by_attr: FxHashMap<String, Buckets>,
}

impl NodeIndexes {
    pub(crate) fn contains(&self, attr: &str) -> bool {
        self.by_attr.contains_key(attr)
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.by_attr.keys().map(String::as_str)
    }

    pub(crate) fn build<'a, I>(&mut self, attr: &str, nodes: I)
    where
        I: IntoIterator<Item = (NodeId, &'a Attrs)>,
    {
        let mut buckets = Buckets::default();
        for (id, attrs) in nodes {
            if let Some(value) = attrs.get(attr) {
                buckets.entry(value.index_key()).or_default().insert(id);
            }
        }
        self.by_attr.insert(attr.to_string(), buckets);
    }

    pub(crate) fn remove(&mut self, attr: &str) -> bool {
        self.by_attr.remove(attr).is_some()
    }

    /// Returns `None` when `attr` is not indexed.
    pub(crate) fn lookup(&self, attr: &str, value: &AttrValue) -> Option<Vec<NodeId>> {
        let buckets = self.by_attr.get(attr)?;
        Some(
            buckets
                .get(&value.index_key())
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default(),
        )
    }

    /// Re-files `id` under its current values for every indexed attribute.
    pub(crate) fn refresh(&mut self, id: NodeId, attrs: &Attrs) {
        for (attr, buckets) in self.by_attr.iter_mut() {
            detach(buckets, id);
            if let Some(value) = attrs.get(attr) {
                buckets.entry(value.index_key()).or_default().insert(id);
            }
        }
    }

    pub(crate) fn forget(&mut self, id: NodeId) {
        for buckets in self.by_attr.values_mut() {
            detach(buckets, id);
        }
    }
}

fn detach(buckets: &mut Buckets, id: NodeId) {
    buckets.retain(|_, ids| {
        ids.remove(&id);
        !ids.is_empty()
    });
}
