#![forbid(unsafe_code)]
//! arbor-oracle: incremental cycle detection for structure-learning search.
//!
//! Responsibilities:
//! - Mirror the caller's DAG and keep, per node, exact counts of directed
//!   paths to every ancestor and from every descendant.
//! - Answer add/erase/reverse what-if queries in O(1)/O(h) instead of a
//!   full cycle search per candidate.
//! - Replay whole candidate batches against restricted map copies without
//!   touching committed state.
//!
//! **No I/O, no async** here. The search loop drives this oracle.

pub mod batch;
pub mod counts;
pub mod oracle;

pub use batch::PendingChange;
pub use counts::PathCountMap;
pub use oracle::AcyclicityOracle;
