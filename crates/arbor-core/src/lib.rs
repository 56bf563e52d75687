#![forbid(unsafe_code)]
//! arbor-core: shared vocabulary for the arbor inference engine.
//!
//! This crate holds the data model the algorithm crates agree on:
//! - strongly-typed ids (`NodeId`, `ClusterId`, ...),
//! - ordered node sets with the usual set algebra,
//! - a directed-graph container (acyclicity is maintained by the oracle
//!   crate, never self-enforced here),
//! - the cluster graph with cached separators and the running-intersection
//!   check,
//! - the canonical error taxonomy.
//!
//! **No I/O, no async** here. Higher crates own the algorithms.

pub mod cluster;
pub mod dag;
pub mod error;
pub mod id;
pub mod nodeset;
pub mod prelude;

pub use cluster::ClusterGraph;
pub use dag::{ArcEdge, DirectedGraph};
pub use error::{Error, Result};
pub use id::{ClusterId, NodeId, OpId, TableId};
pub use nodeset::NodeSet;
