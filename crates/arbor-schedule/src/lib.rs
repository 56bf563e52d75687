#![forbid(unsafe_code)]
//! arbor-schedule: deferred table operations for junction-tree inference.
//!
//! The inference engine never computes a message directly. It builds a
//! [`Schedule`]: abstract tables wired together by Combine / Project /
//! Delete operators. Nothing is materialized until `execute_all`, so the
//! whole plan can be costed (`nb_operations`, `memory_usage`), deduplicated
//! and reordered first.
//!
//! The concrete table type stays behind the [`Tabular`] seam: the layer
//! only ever asks a table for its dimension labels and domain sizes, plus
//! the combine/project function references the caller supplies.

pub mod error;
pub mod operator;
pub mod schedule;
pub mod table;

pub use error::{Result, ScheduleError};
pub use operator::{CombineFn, MemoryDelta, OpKind, ProjectFn, ScheduleOperator};
pub use schedule::{DuplicateKind, Schedule};
pub use table::{Dim, ScheduleTable, TableState, TableStore, Tabular};
