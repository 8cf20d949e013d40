//! Command-line support: edge-list import, the multi-round extraction loop
//! and feature table export.

#![forbid(unsafe_code)]

/// Edge-list loading, round orchestration and CSV export.
pub mod extract;
