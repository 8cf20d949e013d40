//! Recursive role features.
//!
//! [`RoleFeatureDriver`] computes a first round of structural features from
//! the graph, derives further rounds by aggregating earlier features over
//! the same neighborhoods, and prunes near-duplicate features by comparing
//! their quantile bins. Features live as node attributes on the graph.

mod binning;
mod features;
mod metrics;
mod options;
mod reps;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

pub use metrics::{default_metrics, CounterMetrics, NoopMetrics, PruneMetrics};
pub use options::{ConfigError, RoleOptions};

use binning::BinTable;
use reps::{DisjointSet, RepKey};

use crate::storage::Graph;
use crate::types::{NodeId, Result, RoleError};

/// Feature generation and pruning for one analysis session.
///
/// Bin tables and pairwise comparison results are kept across calls so
/// later rounds reuse earlier work. Re-binning a feature drops whatever was
/// cached for it; [`RoleFeatureDriver::clear`] drops everything.
pub struct RoleFeatureDriver {
    opts: RoleOptions,
    bins: FxHashMap<String, BinTable>,
    matches: FxHashMap<(String, String, u32), bool>,
    metrics: Arc<dyn PruneMetrics>,
}

impl fmt::Debug for RoleFeatureDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleFeatureDriver")
            .field("opts", &self.opts)
            .field("binned", &self.bins.len())
            .field("memoized", &self.matches.len())
            .finish()
    }
}

impl RoleFeatureDriver {
    /// Creates a driver after validating `opts`.
    pub fn new(opts: RoleOptions) -> Result<Self> {
        opts.validate()?;
        Ok(Self {
            opts,
            bins: FxHashMap::default(),
            matches: FxHashMap::default(),
            metrics: default_metrics(),
        })
    }

    /// Reports pruning work to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn PruneMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Active options.
    pub fn options(&self) -> &RoleOptions {
        &self.opts
    }

    /// Round 0: structural features at hop radius 0 and 1, links weighted
    /// by the configured weight attribute. `None` targets every node.
    pub fn first_round(
        &self,
        graph: &mut Graph,
        nodes: Option<&[NodeId]>,
    ) -> Result<Vec<String>> {
        let started = Instant::now();
        let names = features::first_round(graph, nodes, &self.opts.weight_attr)?;
        info!(
            round = 0,
            features = names.len(),
            nodes = nodes.map_or(graph.node_count(), <[NodeId]>::len),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "roles.round.completed"
        );
        Ok(names)
    }

    /// Round n: aggregates each of `attrs` over hop radius 0 and 1.
    pub fn next_round(
        &self,
        graph: &mut Graph,
        nodes: Option<&[NodeId]>,
        attrs: &[String],
    ) -> Result<Vec<String>> {
        let started = Instant::now();
        let names = features::next_round(graph, nodes, attrs, &self.opts.bin_prefix)?;
        info!(
            inputs = attrs.len(),
            features = names.len(),
            nodes = nodes.map_or(graph.node_count(), <[NodeId]>::len),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "roles.round.completed"
        );
        Ok(names)
    }

    /// Round dispatch: `None` runs round 0, an empty list does nothing, and
    /// anything else runs a recursive round over those attributes.
    pub fn calculate_attrs(
        &self,
        graph: &mut Graph,
        nodes: Option<&[NodeId]>,
        attrs: Option<&[String]>,
    ) -> Result<Vec<String>> {
        match attrs {
            None => self.first_round(graph, nodes),
            Some([]) => Ok(Vec::new()),
            Some(attrs) => self.next_round(graph, nodes, attrs),
        }
    }

    /// Name `attr` is binned under.
    pub fn binned_name(&self, attr: &str) -> String {
        format!("{}{attr}", self.opts.bin_prefix)
    }

    /// Quantile-bins `attr` with minimum bin share `fraction`, writing the
    /// bin index of every node under [`RoleFeatureDriver::binned_name`].
    /// Returns that name.
    pub fn vertical_bin(
        &mut self,
        graph: &mut Graph,
        attr: &str,
        fraction: f64,
    ) -> Result<String> {
        let out = self.binned_name(attr);
        let table = binning::vertical_bin(graph, attr, &out, fraction)?;
        debug!(attr, bins = table.max_bin(), "roles.bin.completed");
        self.invalidate(&out);
        self.bins.insert(out.clone(), table);
        Ok(out)
    }

    /// Like [`RoleFeatureDriver::vertical_bin`] with the configured fraction.
    pub fn bin(&mut self, graph: &mut Graph, attr: &str) -> Result<String> {
        let fraction = self.opts.bin_fraction;
        self.vertical_bin(graph, attr, fraction)
    }

    /// Representatives of `candidates` after merging binned features that
    /// agree within `max_dist` bins.
    ///
    /// Every candidate must have been binned by this driver. Within a
    /// group of agreeing features, the one with the fewest `-` segments,
    /// then without the `-wn0-` tag, then the shortest name, then first in
    /// byte order, represents the group.
    pub fn calculate_reps(
        &mut self,
        graph: &Graph,
        max_dist: u32,
        candidates: &[String],
    ) -> Result<BTreeSet<String>> {
        let started = Instant::now();
        let mut keys: Vec<RepKey> = candidates
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|name| RepKey::new(name))
            .collect();
        keys.sort();
        for key in &keys {
            if !self.bins.contains_key(key.name()) {
                return Err(RoleError::NotFound("binned feature"));
            }
        }

        let mut set = DisjointSet::new(keys.len());
        let mut exact: FxHashSet<usize> = FxHashSet::default();
        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                let (a, b) = (keys[i].name(), keys[j].name());
                let pair = (a.to_string(), b.to_string(), max_dist);
                if let Some(&known) = self.matches.get(&pair) {
                    self.metrics.pair_memo_hit();
                    if known {
                        set.union(i, j);
                    }
                    continue;
                }
                if exact.contains(&j) {
                    continue;
                }
                self.metrics.pair_compared();
                let agree = reps::orders_agree(
                    graph,
                    (a, &self.bins[a]),
                    (b, &self.bins[b]),
                    max_dist,
                    self.metrics.as_ref(),
                )?;
                self.matches.insert(pair, agree);
                if agree {
                    set.union(i, j);
                    if max_dist == 0 {
                        exact.insert(j);
                    }
                }
            }
        }

        let reps: BTreeSet<String> = (0..keys.len())
            .filter(|&slot| set.is_root(slot))
            .map(|slot| keys[slot].name().to_string())
            .collect();
        info!(
            candidates = keys.len(),
            reps = reps.len(),
            max_dist,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "roles.reps.completed"
        );
        Ok(reps)
    }

    /// Forgets the bin table and every comparison involving `binned`.
    pub fn invalidate(&mut self, binned: &str) {
        self.bins.remove(binned);
        self.matches.retain(|(a, b, _), _| a != binned && b != binned);
    }

    /// Forgets every cached bin table and comparison.
    pub fn clear(&mut self) {
        self.bins.clear();
        self.matches.clear();
    }

    /// Names of features binned by this driver, sorted.
    pub fn binned_features(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bins.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of memoized pair comparisons.
    pub fn memoized_pairs(&self) -> usize {
        self.matches.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(values: &[(&str, [f64; 4])]) -> Graph {
        let mut graph = Graph::new();
        for i in 0..4 {
            graph.add_node_with_id(NodeId(i));
        }
        for (attr, row) in values {
            for (i, v) in row.iter().enumerate() {
                graph.set_node_attr(NodeId(i as u64), *attr, *v).unwrap();
            }
        }
        graph
    }

    fn bin_all(driver: &mut RoleFeatureDriver, graph: &mut Graph, attrs: &[&str]) -> Vec<String> {
        attrs
            .iter()
            .map(|attr| driver.vertical_bin(graph, attr, 0.5).unwrap())
            .collect()
    }

    #[test]
    fn duplicates_collapse_to_preferred_name() {
        let mut graph = scored(&[
            ("xes0-f", [1.0, 2.0, 3.0, 4.0]),
            ("xe0-f", [2.0, 4.0, 6.0, 8.0]),
            ("xed0-f", [4.0, 3.0, 2.0, 1.0]),
        ]);
        let mut driver = RoleFeatureDriver::new(RoleOptions::default()).unwrap();
        let binned = bin_all(&mut driver, &mut graph, &["xes0-f", "xe0-f", "xed0-f"]);
        let reps = driver.calculate_reps(&graph, 0, &binned).unwrap();
        let expected: BTreeSet<String> =
            ["wgt-xe0-f", "wgt-xed0-f"].iter().map(|s| s.to_string()).collect();
        assert_eq!(reps, expected);
        assert_eq!(driver.memoized_pairs(), 2);
    }

    #[test]
    fn memo_answers_repeated_pairs() {
        let mut graph = scored(&[("a", [1.0, 2.0, 3.0, 4.0]), ("b", [1.0, 2.0, 3.0, 4.0])]);
        let metrics = Arc::new(CounterMetrics::default());
        let mut driver = RoleFeatureDriver::new(RoleOptions::default())
            .unwrap()
            .with_metrics(metrics.clone());
        let binned = bin_all(&mut driver, &mut graph, &["a", "b"]);
        driver.calculate_reps(&graph, 0, &binned).unwrap();
        let reps = driver.calculate_reps(&graph, 0, &binned).unwrap();
        assert_eq!(reps.len(), 1);
        let (compared, hits, _) = metrics.snapshot();
        assert_eq!((compared, hits), (1, 1));

        driver.vertical_bin(&mut graph, "a", 0.5).unwrap();
        assert_eq!(driver.memoized_pairs(), 0);
    }

    #[test]
    fn binned_features_track_rebinning_and_clear() {
        let mut graph = scored(&[("b", [4.0, 3.0, 2.0, 1.0]), ("a", [1.0, 2.0, 3.0, 4.0])]);
        let mut driver = RoleFeatureDriver::new(RoleOptions::default()).unwrap();
        bin_all(&mut driver, &mut graph, &["b", "a"]);
        assert_eq!(driver.binned_features(), vec!["wgt-a", "wgt-b"]);
        driver.bin(&mut graph, "a").unwrap();
        assert_eq!(driver.binned_features().len(), 2);
        driver.invalidate("wgt-b");
        assert_eq!(driver.binned_features(), vec!["wgt-a"]);
        driver.clear();
        assert!(driver.binned_features().is_empty());
    }

    #[test]
    fn distance_threshold_controls_merging() {
        // Bins: a = [1, 1, 2, 3], b = [0, 0, 1, 2].
        let mut graph = scored(&[("a", [1.0, 2.0, 3.0, 4.0]), ("b", [0.0, 0.0, 3.0, 4.0])]);
        let mut driver = RoleFeatureDriver::new(RoleOptions::default()).unwrap();
        let binned = bin_all(&mut driver, &mut graph, &["a", "b"]);
        assert_eq!(driver.calculate_reps(&graph, 0, &binned).unwrap().len(), 2);
        assert_eq!(driver.calculate_reps(&graph, 1, &binned).unwrap().len(), 1);
        assert_eq!(driver.memoized_pairs(), 2);
    }

    #[test]
    fn unbinned_candidate_is_rejected() {
        let graph = Graph::new();
        let mut driver = RoleFeatureDriver::new(RoleOptions::default()).unwrap();
        let err = driver
            .calculate_reps(&graph, 0, &["wgt-nope".to_string()])
            .unwrap_err();
        assert!(matches!(err, RoleError::NotFound(_)));
    }

    #[test]
    fn dispatch_by_attribute_list() {
        let mut graph = Graph::new();
        graph.add_link(NodeId(0), NodeId(1), None);
        let driver = RoleFeatureDriver::new(RoleOptions::default()).unwrap();
        assert!(driver.calculate_attrs(&mut graph, None, Some(&[])).unwrap().is_empty());
        let first = driver.calculate_attrs(&mut graph, None, None).unwrap();
        assert_eq!(first.len(), 26);
        let next = driver
            .calculate_attrs(&mut graph, None, Some(&first[..1]))
            .unwrap();
        assert_eq!(next.len(), 16);
        assert_eq!(next[0], "xes0-wn0");
    }
}
