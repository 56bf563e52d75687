use thiserror::Error;

use crate::id::{ClusterId, NodeId};

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the graph crates.
///
/// Structural errors (`Cycle`, `MultipleRoots`) signal an invalid request
/// and are never retried. Lookup errors (`UnknownNode`, `UnknownCluster`,
/// `MissingEdge`) are raised only by calls that must return a value;
/// mutating calls with a documented no-op contract never raise them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("adding arc {tail} -> {head} would create a directed cycle")]
    Cycle { tail: NodeId, head: NodeId },

    #[error("component already has root {first}, cannot also use {second}")]
    MultipleRoots { first: ClusterId, second: ClusterId },

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("unknown cluster: {0}")]
    UnknownCluster(ClusterId),

    #[error("no edge between clusters {a} and {b}")]
    MissingEdge { a: ClusterId, b: ClusterId },
}
