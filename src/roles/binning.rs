use std::collections::BTreeMap;

use crate::storage::Graph;
use crate::types::{NodeId, Result, RoleError};

/// Values closer than this share a bin.
pub(crate) const TIE_TOLERANCE: f64 = 0.01;

/// Values at most this far from zero go straight to bin 0.
const ZERO_TOLERANCE: f64 = 1e-5;

/// Nodes grouped by bin index for one binned feature.
#[derive(Clone, Debug, Default)]
pub(crate) struct BinTable {
    bins: BTreeMap<u32, Vec<NodeId>>,
    max_bin: u32,
}

impl BinTable {
    pub(crate) fn max_bin(&self) -> u32 {
        self.max_bin
    }

    /// Nodes in bin `index`.
    pub(crate) fn bin(&self, index: u32) -> &[NodeId] {
        self.bins.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    fn push(&mut self, index: u32, id: NodeId) {
        self.bins.entry(index).or_default().push(id);
        self.max_bin = self.max_bin.max(index);
    }
}

/// Quantile-bins `attr` into `out` on every node.
///
/// Zero values land in bin 0. The rest are swept in ascending order from
/// bin 1; a new bin opens only when the current one holds at least
/// `ceil(fraction * remaining)` nodes and the next value differs from the
/// previous one by more than [`TIE_TOLERANCE`]. Missing values read as zero.
pub(crate) fn vertical_bin(
    graph: &mut Graph,
    attr: &str,
    out: &str,
    fraction: f64,
) -> Result<BinTable> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(RoleError::Invalid(format!(
            "bin fraction must be in (0, 1], got {fraction}"
        )));
    }

    let mut values = Vec::new();
    let mut zeros = Vec::new();
    for node in graph.nodes() {
        let value = node.number(attr)?;
        if value.abs() > ZERO_TOLERANCE {
            values.push((value, node.id()));
        } else {
            zeros.push(node.id());
        }
    }
    values.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut table = BinTable::default();
    for id in zeros {
        graph.set_node_attr(id, out, 0.0)?;
        table.push(0, id);
    }

    let total = values.len();
    let needed_for = |remaining: usize| (fraction * remaining as f64).ceil() as usize;
    let mut score = 1u32;
    let mut needed = needed_for(total);
    let mut in_bin = 0usize;
    let mut prev = values.first().map(|(v, _)| *v).unwrap_or(0.0);
    for (added, &(value, id)) in values.iter().enumerate() {
        if (value - prev).abs() > TIE_TOLERANCE && in_bin >= needed {
            score += 1;
            in_bin = 0;
            needed = needed_for(total - added);
        }
        prev = value;
        graph.set_node_attr(id, out, f64::from(score))?;
        table.push(score, id);
        in_bin += 1;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(values: &[f64]) -> Graph {
        let mut graph = Graph::new();
        for (i, v) in values.iter().enumerate() {
            let id = graph.add_node_with_id(NodeId(i as u64));
            graph.set_node_attr(id, "f", *v).unwrap();
        }
        graph
    }

    fn bins(graph: &Graph) -> Vec<f64> {
        graph
            .nodes()
            .map(|node| node.number("wgt-f").unwrap())
            .collect()
    }

    #[test]
    fn halves_shrink_with_remaining_nodes() {
        let mut graph = graph_with(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let table = vertical_bin(&mut graph, "f", "wgt-f", 0.5).unwrap();
        // 8 non-zero values: 4 land in bin 1, then 2, then 1, then 1.
        assert_eq!(bins(&graph), vec![0.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 3.0, 4.0]);
        assert_eq!(table.max_bin(), 4);
        assert_eq!(table.bin(0), &[NodeId(0)]);
        assert_eq!(table.bin(2).len(), 2);
        assert!(table.bin(9).is_empty());
    }

    #[test]
    fn ties_share_a_bin_past_occupancy() {
        let mut graph = graph_with(&[1.0, 1.0, 1.005, 1.0, 2.0]);
        vertical_bin(&mut graph, "f", "wgt-f", 0.25).unwrap();
        assert_eq!(bins(&graph), vec![1.0, 1.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn all_zero_input_is_not_an_error() {
        let mut graph = graph_with(&[0.0, 0.0]);
        graph.add_node().unwrap();
        let table = vertical_bin(&mut graph, "f", "wgt-f", 0.5).unwrap();
        assert_eq!(table.max_bin(), 0);
        assert_eq!(bins(&graph), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn fraction_out_of_range_is_rejected() {
        let mut graph = graph_with(&[1.0]);
        assert!(matches!(
            vertical_bin(&mut graph, "f", "wgt-f", 0.0),
            Err(RoleError::Invalid(_))
        ));
    }
}
