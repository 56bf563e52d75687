use thiserror::Error;

use arbor_core::TableId;

/// Canonical result for the scheduling layer.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Usage errors in how the deferred layer is driven. Fatal to the call,
/// not to the process; never retried internally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("operator expects {expected} arguments, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("incompatible table: {0}")]
    Incompatible(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("unknown table: {0}")]
    UnknownTable(TableId),

    #[error("unknown operator id")]
    UnknownOperator,

    #[error("argument {0} has no concrete value yet")]
    AbstractArgument(TableId),

    #[error("operator dependencies contain a cycle")]
    CyclicPlan,
}
