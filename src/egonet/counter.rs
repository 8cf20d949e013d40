use std::borrow::Borrow;
use std::hash::Hash;

use rustc_hash::FxHashMap;

/// Magnitude below which an accumulated value is treated as exactly zero.
pub const TOLERANCE: f64 = 0.0001;

/// Map from key to `f64` that reads absent keys as zero.
///
/// Entries whose value falls below [`TOLERANCE`] in magnitude are dropped, so
/// floating point residue never shows up as a spurious non-zero count.
#[derive(Clone, Debug)]
pub struct Counter<K> {
    values: FxHashMap<K, f64>,
}

impl<K> Default for Counter<K> {
    fn default() -> Self {
        Self {
            values: FxHashMap::default(),
        }
    }
}

impl<K: Eq + Hash> Counter<K> {
    /// Creates an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, zero when absent.
    pub fn get<Q>(&self, key: &Q) -> f64
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    /// Stores `value`, dropping the entry when it is within tolerance of zero.
    pub fn put(&mut self, key: K, value: f64) {
        if value.abs() < TOLERANCE {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }
    }

    /// Adds `amount` and returns the new value.
    pub fn increment(&mut self, key: K, amount: f64) -> f64 {
        let next = self.get(&key) + amount;
        self.put(key, next);
        next
    }

    /// Subtracts `amount` and returns the new value.
    pub fn decrement(&mut self, key: K, amount: f64) -> f64 {
        self.increment(key, -amount)
    }

    /// Whether the value for `key` is within tolerance of `value`.
    pub fn is<Q>(&self, key: &Q, value: f64) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        (self.get(key) - value).abs() < TOLERANCE
    }

    /// Whether a non-zero entry exists for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.values.contains_key(key)
    }

    /// Number of non-zero entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether every entry is zero.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys with non-zero values.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.values.keys()
    }

    /// Non-zero entries.
    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.values.iter().map(|(k, v)| (k, *v))
    }

    /// Sum of all values.
    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }
}

impl<K: Eq + Hash + Clone> Counter<K> {
    /// Scales values so they sum to one. A sum near zero leaves the counter untouched.
    pub fn normalize(&mut self) {
        let sum = self.total();
        if sum.abs() < 0.001 {
            return;
        }
        let keys: Vec<K> = self.values.keys().cloned().collect();
        for key in keys {
            let value = self.get(&key) / sum;
            self.put(key, value);
        }
    }

    /// Key with the largest value.
    pub fn argmax(&self) -> Option<K> {
        self.values
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k.clone())
    }

    /// Key with the smallest value.
    pub fn argmin(&self) -> Option<K> {
        self.values
            .iter()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k.clone())
    }
}
