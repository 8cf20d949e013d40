use std::collections::BTreeSet;

use proptest::prelude::*;
use rolegraph::egonet::{Egonet, XEDT, XEST, XEU};
use rolegraph::storage::{Dir, Graph};
use rolegraph::types::NodeId;
use rolegraph::RoleFeatureDriver;
use rolegraph::RoleOptions;

fn arb_links() -> impl Strategy<Value = Vec<(u64, u64)>> {
    prop::collection::vec((0u64..12, 0u64..12), 0..60)
}

/// Distinct links oriented from lower to higher id, without self-loops.
fn oriented(links: &[(u64, u64)]) -> BTreeSet<(u64, u64)> {
    links
        .iter()
        .filter(|(s, d)| s != d)
        .map(|&(s, d)| (s.min(d), s.max(d)))
        .collect()
}

fn build(links: impl IntoIterator<Item = (u64, u64)>) -> Graph {
    let mut graph = Graph::new();
    for (s, d) in links {
        graph.add_link(NodeId(s), NodeId(d), None);
    }
    graph
}

proptest! {
    #[test]
    fn prop_link_removal_keeps_adjacency_consistent(
        links in arb_links(),
        drop in prop::collection::vec(any::<bool>(), 60),
    ) {
        let mut graph = Graph::new();
        let ids: Vec<_> = links
            .iter()
            .map(|&(s, d)| graph.add_link(NodeId(s), NodeId(d), None))
            .collect();
        let mut kept = Vec::new();
        for (i, id) in ids.into_iter().enumerate() {
            if drop[i] {
                graph.remove_link(id).unwrap();
            } else {
                kept.push(links[i]);
            }
        }

        prop_assert_eq!(graph.link_count(), kept.len());
        let touched: BTreeSet<u64> = kept.iter().flat_map(|&(s, d)| [s, d]).collect();
        prop_assert_eq!(graph.node_count(), touched.len());
        let outs: usize = graph.nodes().map(|n| n.num_out_links()).sum();
        let ins: usize = graph.nodes().map(|n| n.num_in_links()).sum();
        prop_assert_eq!(outs, kept.len());
        prop_assert_eq!(ins, kept.len());
    }

    #[test]
    fn prop_hop_zero_external_totals_match_degree(links in arb_links()) {
        let simple: Vec<_> = links.iter().copied().filter(|(s, d)| s != d).collect();
        let graph = build(simple);
        for node in graph.nodes() {
            let counts = Egonet::new(&graph, [node.id()], 0, Dir::Both)
                .counts(&[])
                .unwrap();
            prop_assert_eq!(counts.get(XEST), node.num_out_links() as f64);
            prop_assert_eq!(counts.get(XEDT), node.num_in_links() as f64);
        }
    }

    #[test]
    fn prop_unique_external_links_match_external_nodes(links in arb_links()) {
        let graph = build(oriented(&links));
        for id in graph.node_ids() {
            let ego = Egonet::new(&graph, [id], 0, Dir::Both);
            let counts = ego.counts(&[]).unwrap();
            prop_assert_eq!(counts.get(XEU), ego.num_external_nodes() as f64);
        }
    }

    #[test]
    fn prop_bins_are_monotone(
        values in prop::collection::vec(0u32..50, 1..40),
        fraction in 0.05f64..=1.0,
    ) {
        let mut graph = Graph::new();
        for (i, v) in values.iter().enumerate() {
            let id = graph.add_node_with_id(NodeId(i as u64));
            graph.set_node_attr(id, "f", f64::from(*v)).unwrap();
        }
        let mut driver = RoleFeatureDriver::new(RoleOptions::default()).unwrap();
        let out = driver.vertical_bin(&mut graph, "f", fraction).unwrap();
        let bin = |i: usize| graph.node(NodeId(i as u64)).unwrap().number(&out).unwrap();
        for a in 0..values.len() {
            for b in 0..values.len() {
                if values[a] > values[b] {
                    prop_assert!(bin(a) >= bin(b));
                } else if values[a] == values[b] {
                    prop_assert_eq!(bin(a), bin(b));
                }
            }
            if values[a] == 0 {
                prop_assert_eq!(bin(a), 0.0);
            }
        }
    }
}
