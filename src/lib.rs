//! Recursive structural role features for attributed directed multigraphs.
//!
//! The crate is layered leaves first:
//!
//! - [`storage`] holds nodes, links and attribute values.
//! - [`egonet`] materializes k-hop neighborhoods and counts the links inside
//!   and across their boundary, with [`egonet::EgonetGenerator`] sharing
//!   per-node summaries between many such queries.
//! - [`roles`] drives feature rounds and prunes duplicate features.
//! - [`cli`] loads edge lists and runs the extraction loop for the binary.

#![warn(missing_docs)]

pub mod cli;
pub mod egonet;
pub mod roles;
pub mod storage;
pub mod types;

pub use egonet::{Egonet, EgonetCounts, EgonetGenerator, GeneratorOptions};
pub use roles::{RoleFeatureDriver, RoleOptions};
pub use storage::{AttrValue, Attrs, Dir, Graph};
pub use types::{LinkId, NodeId, Result, RoleError};
