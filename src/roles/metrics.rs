use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the near-duplicate feature search.
///
/// The pairwise comparison in [`super::RoleFeatureDriver::calculate_reps`]
/// dominates pruning cost; these hooks report how much of it the memo saved.
pub trait PruneMetrics: Send + Sync {
    /// A feature pair was compared node by node.
    fn pair_compared(&self);

    /// A feature pair was answered from the memo.
    fn pair_memo_hit(&self);

    /// `n` node bin values were inspected during one comparison.
    fn nodes_checked(&self, n: u64);
}

/// Discards everything.
#[derive(Default)]
pub struct NoopMetrics;

impl PruneMetrics for NoopMetrics {
    fn pair_compared(&self) {}
    fn pair_memo_hit(&self) {}
    fn nodes_checked(&self, _n: u64) {}
}

/// Atomic tallies of every hook.
#[derive(Default)]
pub struct CounterMetrics {
    /// Pairs compared node by node.
    pub pairs_compared: AtomicU64,

    /// Pairs answered from the memo.
    pub memo_hits: AtomicU64,

    /// Node bin values inspected.
    pub nodes_checked: AtomicU64,
}

impl CounterMetrics {
    /// Current values as `(pairs_compared, memo_hits, nodes_checked)`.
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.pairs_compared.load(Ordering::Relaxed),
            self.memo_hits.load(Ordering::Relaxed),
            self.nodes_checked.load(Ordering::Relaxed),
        )
    }
}

impl PruneMetrics for CounterMetrics {
    fn pair_compared(&self) {
        self.pairs_compared.fetch_add(1, Ordering::Relaxed);
    }

    fn pair_memo_hit(&self) {
        self.memo_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn nodes_checked(&self, n: u64) {
        self.nodes_checked.fetch_add(n, Ordering::Relaxed);
    }
}

/// The default, [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn PruneMetrics> {
    Arc::new(NoopMetrics)
}
