#![forbid(unsafe_code)]
//! arbor: junction-tree construction and execution scheduling for exact
//! inference over graphical models.
//!
//! This facade re-exports the workspace crates:
//! - [`arbor_core`]: ids, node sets, DAG and cluster-graph containers.
//! - [`arbor_oracle`]: incremental acyclicity oracle for structure search.
//! - [`arbor_planner`]: binary join tree planning and barren-node pruning.
//! - [`arbor_schedule`]: deferred table operations with cost estimation.

pub use arbor_core as core;
pub use arbor_oracle as oracle;
pub use arbor_planner as planner;
pub use arbor_schedule as schedule;
