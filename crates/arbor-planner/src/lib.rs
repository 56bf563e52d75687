#![forbid(unsafe_code)]
//! arbor-planner: from an arbitrary cluster graph to an executable
//! message-passing layout.
//!
//! Two planning passes live here:
//! - [`binarize::BinaryJoinTreePlanner`] rewrites a junction tree so every
//!   non-root cluster has at most three neighbors, greedily merging the
//!   cheapest separator pairs first so synthetic clusters stay small.
//! - [`barren::BarrenNodeFinder`] computes, per tree edge and direction,
//!   the subset of the sending cluster that is provably irrelevant to that
//!   message given the observed nodes.
//!
//! Both passes consume the caller's structures read-only and produce fresh
//! outputs; nothing here mutates an input graph.

pub mod barren;
pub mod binarize;
pub mod cost;

pub use barren::{BarrenNodeFinder, BarrenResult};
pub use binarize::{BinaryJoinTreePlanner, BinaryPlan};
pub use cost::DomainSizes;
