use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Result, RoleError};

/// Tunables for feature extraction and pruning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleOptions {
    /// Link attribute weighting the first round.
    pub weight_attr: String,
    /// Prefix of binned feature names. Stripped again when a binned feature
    /// feeds the next round.
    pub bin_prefix: String,
    /// Minimum share of the remaining nodes each bin must hold.
    pub bin_fraction: f64,
    /// Largest bin difference at which two features still count as duplicates.
    pub max_dist: u32,
    /// Upper bound on recursive rounds after the first.
    pub max_rounds: usize,
}

impl Default for RoleOptions {
    fn default() -> Self {
        Self {
            weight_attr: "wgt".to_string(),
            bin_prefix: "wgt-".to_string(),
            bin_fraction: 0.5,
            max_dist: 0,
            max_rounds: 3,
        }
    }
}

impl RoleOptions {
    /// Reads options from a TOML file; absent keys keep their defaults.
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Sets the first-round weight attribute.
    pub fn weight_attr(mut self, attr: impl Into<String>) -> Self {
        self.weight_attr = attr.into();
        self
    }

    /// Sets the binned feature prefix.
    pub fn bin_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.bin_prefix = prefix.into();
        self
    }

    /// Sets the minimum bin share.
    pub fn bin_fraction(mut self, fraction: f64) -> Self {
        self.bin_fraction = fraction;
        self
    }

    /// Sets the duplicate tolerance in bins.
    pub fn max_dist(mut self, dist: u32) -> Self {
        self.max_dist = dist;
        self
    }

    /// Sets the round limit.
    pub fn max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Rejects values the driver cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.bin_fraction > 0.0 && self.bin_fraction <= 1.0) {
            return Err(RoleError::Invalid(format!(
                "bin fraction must be in (0, 1], got {}",
                self.bin_fraction
            )));
        }
        if self.weight_attr.is_empty() {
            return Err(RoleError::Invalid("weight attribute name is empty".into()));
        }
        Ok(())
    }
}

/// Failure loading [`RoleOptions`] from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid options TOML.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}
