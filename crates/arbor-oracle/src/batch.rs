//! Batch what-if queries over candidate edit sets.
//!
//! A structure-learning step typically weighs several edits at once. The
//! batch check replays them against *restricted copies* of the count maps
//! (keys limited to the nodes the batch touches), so the cost of copying is
//! amortized over the whole candidate batch and the oracle's own state is
//! never touched.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use arbor_core::NodeId;

use crate::counts::PathCountMap;
use crate::oracle::AcyclicityOracle;

/// One candidate edit. Ephemeral: used only for batch queries, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingChange {
    Add { tail: NodeId, head: NodeId },
    Erase { tail: NodeId, head: NodeId },
    Reverse { tail: NodeId, head: NodeId },
}

impl PendingChange {
    pub fn add(tail: NodeId, head: NodeId) -> Self {
        Self::Add { tail, head }
    }
    pub fn erase(tail: NodeId, head: NodeId) -> Self {
        Self::Erase { tail, head }
    }
    pub fn reverse(tail: NodeId, head: NodeId) -> Self {
        Self::Reverse { tail, head }
    }
}

impl AcyclicityOracle {
    /// Whether applying the whole batch would leave a directed cycle.
    ///
    /// Reversals are normalized to erase + add, add/erase pairs over the
    /// same arc cancel out, and any surviving self-loop addition fails
    /// fast. The remaining erasures are replayed first, then the additions,
    /// each addition checked against the restricted ancestor maps. Nodes
    /// the mirror does not know are treated as fresh isolated nodes.
    pub fn would_create_cycle(&self, batch: &[PendingChange]) -> bool {
        let mut adds: Vec<(NodeId, NodeId)> = Vec::new();
        let mut erases: Vec<(NodeId, NodeId)> = Vec::new();
        for change in batch {
            match *change {
                PendingChange::Add { tail, head } => adds.push((tail, head)),
                PendingChange::Erase { tail, head } => erases.push((tail, head)),
                PendingChange::Reverse { tail, head } => {
                    erases.push((tail, head));
                    adds.push((head, tail));
                }
            }
        }

        if adds.iter().any(|&(t, h)| t == h) {
            return true;
        }

        // Cancel add/erase pairs over the same arc (multiset semantics).
        let mut erase_budget: BTreeMap<(NodeId, NodeId), usize> = BTreeMap::new();
        for &arc in &erases {
            *erase_budget.entry(arc).or_insert(0) += 1;
        }
        let mut cancelled: BTreeMap<(NodeId, NodeId), usize> = BTreeMap::new();
        adds.retain(|arc| match erase_budget.get_mut(arc) {
            Some(n) if *n > 0 => {
                *n -= 1;
                *cancelled.entry(*arc).or_insert(0) += 1;
                false
            }
            _ => true,
        });
        erases.retain(|arc| match cancelled.get_mut(arc) {
            Some(n) if *n > 0 => {
                *n -= 1;
                false
            }
            _ => true,
        });

        let mut touched: BTreeSet<NodeId> = BTreeSet::new();
        for &(t, h) in adds.iter().chain(erases.iter()) {
            touched.insert(t);
            touched.insert(h);
        }
        if touched.is_empty() {
            return false;
        }

        // Restricted copies: only touched nodes get maps, and only touched
        // targets are tracked. Values remain exact full-graph counts.
        let mut r_anc: BTreeMap<NodeId, PathCountMap> = BTreeMap::new();
        let mut r_desc: BTreeMap<NodeId, PathCountMap> = BTreeMap::new();
        let mut present: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
        for &n in &touched {
            match self.ancestor_counts(n) {
                Ok(map) => {
                    r_anc.insert(n, map.restricted_to(&touched));
                }
                Err(_) => {
                    r_anc.insert(n, PathCountMap::new());
                }
            }
            match self.descendant_counts(n) {
                Ok(map) => {
                    r_desc.insert(n, map.restricted_to(&touched));
                }
                Err(_) => {
                    r_desc.insert(n, PathCountMap::new());
                }
            }
        }
        for &arc in adds.iter().chain(erases.iter()) {
            if self.dag().exists_arc(arc.0, arc.1) {
                present.insert(arc);
            }
        }

        for (tail, head) in erases {
            if !present.remove(&(tail, head)) {
                continue; // erasing an absent arc is a no-op
            }
            replay_delta(&mut r_anc, &mut r_desc, tail, head, Dir::Sub);
        }
        for (tail, head) in adds {
            if present.contains(&(tail, head)) {
                continue; // adding an existing arc is a no-op
            }
            if r_anc[&tail].contains(head) {
                return true;
            }
            present.insert((tail, head));
            replay_delta(&mut r_anc, &mut r_desc, tail, head, Dir::Add);
        }
        false
    }
}

enum Dir {
    Add,
    Sub,
}

/// Applies the path-count delta of one arc edit to the restricted maps,
/// with the same factored update the committed operations use.
fn replay_delta(
    r_anc: &mut BTreeMap<NodeId, PathCountMap>,
    r_desc: &mut BTreeMap<NodeId, PathCountMap>,
    tail: NodeId,
    head: NodeId,
    dir: Dir,
) {
    let mut reach_tail = r_anc[&tail].clone();
    reach_tail.increment(tail, 1);
    let mut reach_head = r_desc[&head].clone();
    reach_head.increment(head, 1);

    let anc_targets: Vec<(NodeId, u64)> =
        std::iter::once((head, 1)).chain(r_desc[&head].iter()).collect();
    let desc_targets: Vec<(NodeId, u64)> =
        std::iter::once((tail, 1)).chain(r_anc[&tail].iter()).collect();

    for (d, w) in anc_targets {
        if let Some(map) = r_anc.get_mut(&d) {
            match dir {
                Dir::Add => map.add_scaled(&reach_tail, w),
                Dir::Sub => map.sub_scaled(&reach_tail, w),
            }
        }
    }
    for (a, w) in desc_targets {
        if let Some(map) = r_desc.get_mut(&a) {
            match dir {
                Dir::Add => map.add_scaled(&reach_head, w),
                Dir::Sub => map.sub_scaled(&reach_head, w),
            }
        }
    }
}
