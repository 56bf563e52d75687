//! Convenient re-exports for downstream crates.

pub use crate::cluster::ClusterGraph;
pub use crate::dag::{ArcEdge, DirectedGraph};
pub use crate::error::{Error, Result};
pub use crate::id::{ClusterId, NodeId, OpId, TableId};
pub use crate::nodeset::NodeSet;
