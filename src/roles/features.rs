use crate::egonet::{
    dest_attr, external_attr, source_attr, within_attr, EgonetCounts, EgonetGenerator,
    GeneratorOptions, WEU, WN, XEDU, XESU, XEU,
};
use crate::storage::{number_or_zero, Graph};
use crate::types::{NodeId, Result};

/// First-round feature stems, in output order.
const FIRST_ROUND: [&str; 13] = [
    "wn", "weu", "wet", "wem", "xesu", "xest", "xesm", "xedu", "xedt", "xedm", "xeu", "xet", "xem",
];

/// Recursive feature stems, in output order.
const NEXT_ROUND: [&str; 8] = ["xes", "xed", "xe", "xesm", "xedm", "xem", "wn", "wnm"];

const HOPS: [usize; 2] = [0, 1];

fn mean(sum: f64, unique: f64) -> f64 {
    if unique > 0.0 {
        sum / unique
    } else {
        0.0
    }
}

fn first_round_row(counts: &EgonetCounts, weight: &str) -> [f64; 13] {
    let we = counts.get(&within_attr(weight));
    let xes = counts.get(&source_attr(weight));
    let xed = counts.get(&dest_attr(weight));
    let xe = counts.get(&external_attr(weight));
    [
        counts.get(WN),
        counts.get(WEU),
        we,
        mean(we, counts.get(WEU)),
        counts.get(XESU),
        xes,
        mean(xes, counts.get(XESU)),
        counts.get(XEDU),
        xed,
        mean(xed, counts.get(XEDU)),
        counts.get(XEU),
        xe,
        mean(xe, counts.get(XEU)),
    ]
}

fn targets(graph: &Graph, nodes: Option<&[NodeId]>) -> Vec<NodeId> {
    match nodes {
        Some(nodes) => nodes.to_vec(),
        None => graph.node_ids(),
    }
}

fn write_rows(graph: &mut Graph, names: &[String], rows: Vec<(NodeId, Vec<f64>)>) -> Result<()> {
    for (id, row) in rows {
        for (name, value) in names.iter().zip(row) {
            graph.set_node_attr(id, name.as_str(), value)?;
        }
    }
    Ok(())
}

/// Bootstrap features from link structure weighted by `weight`.
///
/// Writes 13 features per hop radius (0 and 1) onto every target node and
/// returns their names, radius-0 names first. The `*t` features hold the
/// weighted sums and `*m` the weighted sum per distinct pair.
pub(crate) fn first_round(
    graph: &mut Graph,
    nodes: Option<&[NodeId]>,
    weight: &str,
) -> Result<Vec<String>> {
    let names: Vec<String> = HOPS
        .iter()
        .flat_map(|hop| FIRST_ROUND.iter().map(move |stem| format!("{stem}{hop}")))
        .collect();

    let targets = targets(graph, nodes);
    let rows = {
        let opts = GeneratorOptions::new().edge_attr(weight);
        let generator = EgonetGenerator::new(graph, &opts)?;
        let mut rows = Vec::with_capacity(targets.len());
        for id in targets {
            let mut row = Vec::with_capacity(names.len());
            for hop in HOPS {
                let counts = generator.counts(&[id], hop)?;
                row.extend(first_round_row(&counts, weight));
            }
            rows.push((id, row));
        }
        rows
    };
    write_rows(graph, &names, rows)?;
    Ok(names)
}

/// Name of the feature derived from `stem` at `hop` over input `attr`.
pub(crate) fn derived_name(stem: &str, hop: usize, attr: &str, bin_prefix: &str) -> String {
    let base = attr.strip_prefix(bin_prefix).unwrap_or(attr);
    format!("{stem}{hop}-{base}")
}

/// Sum of `attr` over the far end of every link of `id`, parallel links
/// included and a self-loop counted once.
fn neighbor_sum(graph: &Graph, id: NodeId, attr: &str) -> Result<f64> {
    let Some(node) = graph.node(id) else {
        return Ok(0.0);
    };
    let mut sum = 0.0;
    for link in node.links().into_iter().filter_map(|l| graph.link(l)) {
        if let Some(neighbor) = graph.node(link.other(id)) {
            sum += neighbor.number(attr)?;
        }
    }
    Ok(sum)
}

fn next_round_row(counts: &EgonetCounts, attr: &str, within: f64) -> [f64; 8] {
    let xes = counts.get(&source_attr(attr));
    let xed = counts.get(&dest_attr(attr));
    let xe = counts.get(&external_attr(attr));
    let wn = counts.get(WN);
    [
        xes,
        xed,
        xe,
        mean(xes, counts.get(XESU)),
        mean(xed, counts.get(XEDU)),
        mean(xe, counts.get(XEU)),
        wn,
        mean(within, wn),
    ]
}

/// Recursive features aggregating each of `attrs` over hop-0 and hop-1
/// neighborhoods.
///
/// Output names are `<stem><hop>-<attr>` with `bin_prefix` stripped from
/// the input name, ordered by hop, then input attribute, then stem.
pub(crate) fn next_round(
    graph: &mut Graph,
    nodes: Option<&[NodeId]>,
    attrs: &[String],
    bin_prefix: &str,
) -> Result<Vec<String>> {
    let names: Vec<String> = HOPS
        .iter()
        .flat_map(|&hop| {
            attrs.iter().flat_map(move |attr| {
                NEXT_ROUND
                    .iter()
                    .map(move |stem| derived_name(stem, hop, attr, bin_prefix))
            })
        })
        .collect();

    let targets = targets(graph, nodes);
    let rows = {
        let opts = GeneratorOptions::new().vertex_attrs(attrs.iter().cloned());
        let generator = EgonetGenerator::new(graph, &opts)?;
        let graph: &Graph = graph;
        let mut rows = Vec::with_capacity(targets.len());
        for id in targets {
            let mut row = Vec::with_capacity(names.len());
            for hop in HOPS {
                let counts = generator.counts(&[id], hop)?;
                for attr in attrs {
                    let within = if hop == 0 {
                        match graph.node(id) {
                            Some(node) => number_or_zero(node.attrs(), attr)?,
                            None => 0.0,
                        }
                    } else {
                        neighbor_sum(graph, id, attr)?
                    };
                    row.extend(next_round_row(&counts, attr, within));
                }
            }
            rows.push((id, row));
        }
        rows
    };
    write_rows(graph, &names, rows)?;
    Ok(names)
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
    fn first_round_names_and_values() {
        let mut graph = Graph::new();
        graph.add_link(NodeId(0), NodeId(1), Some(&weighted(2.0)));
        graph.add_link(NodeId(0), NodeId(1), Some(&weighted(4.0)));
        graph.add_link(NodeId(2), NodeId(0), Some(&weighted(1.0)));

        let names = first_round(&mut graph, None, "wgt").unwrap();
        assert_eq!(names.len(), 26);
        assert_eq!(names[0], "wn0");
        assert_eq!(names[2], "wet0");
        assert_eq!(names[13], "wn1");

        let node = graph.node(NodeId(0)).unwrap();
        assert_eq!(node.number("wn0").unwrap(), 1.0);
        assert_eq!(node.number("xesu0").unwrap(), 1.0);
        assert_eq!(node.number("xest0").unwrap(), 6.0);
        assert_eq!(node.number("xesm0").unwrap(), 6.0);
        assert_eq!(node.number("xedt0").unwrap(), 1.0);
        assert_eq!(node.number("xet0").unwrap(), 7.0);
        assert_eq!(node.number("xem0").unwrap(), 3.5);
        assert_eq!(node.number("wem0").unwrap(), 0.0);
        assert_eq!(node.number("wn1").unwrap(), 3.0);
        assert_eq!(node.number("weu1").unwrap(), 2.0);
        assert_eq!(node.number("wet1").unwrap(), 7.0);
        assert_eq!(node.number("wem1").unwrap(), 3.5);
        assert_eq!(node.number("xeu1").unwrap(), 0.0);
    }

    #[test]
    fn first_round_respects_node_subset() {
        let mut graph = Graph::new();
        graph.add_link(NodeId(0), NodeId(1), None);
        first_round(&mut graph, Some(&[NodeId(1)]), "wgt").unwrap();
        assert!(graph.node(NodeId(1)).unwrap().attr("wn0").is_some());
        assert!(graph.node(NodeId(0)).unwrap().attr("wn0").is_none());
    }

    #[test]
    fn next_round_aggregates_neighbor_features() {
        let mut graph = Graph::new();
        graph.add_link(NodeId(0), NodeId(1), None);
        graph.add_link(NodeId(0), NodeId(1), None);
        graph.add_link(NodeId(2), NodeId(0), None);
        for (id, v) in [(0, 1.0), (1, 2.0), (2, 3.0)] {
            graph.set_node_attr(NodeId(id), "wgt-f", v).unwrap();
        }

        let attrs = vec!["wgt-f".to_string()];
        let names = next_round(&mut graph, None, &attrs, "wgt-").unwrap();
        assert_eq!(names.len(), 16);
        assert_eq!(names[0], "xes0-f");
        assert_eq!(names[7], "wnm0-f");
        assert_eq!(names[8], "xes1-f");

        let node = graph.node(NodeId(0)).unwrap();
        assert_eq!(node.number("xes0-f").unwrap(), 2.0);
        assert_eq!(node.number("xed0-f").unwrap(), 3.0);
        assert_eq!(node.number("xe0-f").unwrap(), 5.0);
        assert_eq!(node.number("xem0-f").unwrap(), 2.5);
        assert_eq!(node.number("wn0-f").unwrap(), 1.0);
        assert_eq!(node.number("wnm0-f").unwrap(), 1.0);
        // Both parallel links to node 1 contribute: (2 + 2 + 3) / 3.
        assert!((node.number("wnm1-f").unwrap() - 7.0 / 3.0).abs() < 1e-9);
        assert_eq!(node.number("wn1-f").unwrap(), 3.0);
    }

    #[test]
    fn next_round_rejects_text_features() {
        let mut graph = Graph::new();
        graph.add_link(NodeId(0), NodeId(1), None);
        graph.set_node_attr(NodeId(1), "label", "hub").unwrap();
        let attrs = vec!["label".to_string()];
        assert!(next_round(&mut graph, None, &attrs, "wgt-").is_err());
    }
}
