//! Identifier newtypes and the crate-wide error type.

#![forbid(unsafe_code)]

use std::fmt;

/// Stable identifier of a node in a [`crate::storage::Graph`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NodeId(pub u64);

/// Identifier of a single link; parallel links between the same pair get distinct ids.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct LinkId(pub u64);

/// Errors raised by graph, egonet and role-feature operations.
#[derive(thiserror::Error, Debug)]
pub enum RoleError {
    /// A unique-node lookup matched more than one node.
    #[error("{count} nodes match attribute '{attr}' = {value}; expected at most one")]
    AmbiguousMatch {
        /// Attribute that was queried.
        attr: String,
        /// Display form of the queried value.
        value: String,
        /// Number of matching nodes.
        count: usize,
    },
    /// An attribute expected to be numeric holds another kind of value.
    #[error("attribute '{attr}' is not numeric (found {found})")]
    TypeMismatch {
        /// Offending attribute name.
        attr: String,
        /// Kind of value actually stored.
        found: &'static str,
    },
    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Caller supplied an argument outside the accepted domain.
    #[error("invalid argument: {0}")]
    Invalid(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RoleError>;

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        NodeId(value)
    }
}

impl From<NodeId> for u64 {
    fn from(value: NodeId) -> Self {
        value.0
    }
}
