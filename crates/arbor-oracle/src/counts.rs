//! Exact path-multiplicity maps.
//!
//! For a node `n`, an ancestor map records, per ancestor `a`, how many
//! distinct directed paths lead from `a` to `n`. The counts being exact
//! multiplicities (not booleans) is what makes incremental arc deletion
//! correct: removing one contributing arc subtracts exactly its share and
//! leaves the right residual for paths still present via other routes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use arbor_core::NodeId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathCountMap(BTreeMap<NodeId, u64>);

impl PathCountMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, n: NodeId) -> u64 {
        self.0.get(&n).copied().unwrap_or(0)
    }

    pub fn contains(&self, n: NodeId) -> bool {
        self.0.contains_key(&n)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.0.iter().map(|(&n, &c)| (n, c))
    }

    pub fn increment(&mut self, n: NodeId, by: u64) {
        if by > 0 {
            *self.0.entry(n).or_insert(0) += by;
        }
    }

    /// Adds `other` scaled by `weight`, entry-wise.
    pub fn add_scaled(&mut self, other: &PathCountMap, weight: u64) {
        if weight == 0 {
            return;
        }
        for (n, c) in other.iter() {
            *self.0.entry(n).or_insert(0) += c * weight;
        }
    }

    /// Subtracts `other` scaled by `weight`, entry-wise; entries reaching
    /// zero are removed so membership stays an exact ancestry test.
    pub fn sub_scaled(&mut self, other: &PathCountMap, weight: u64) {
        if weight == 0 {
            return;
        }
        for (n, c) in other.iter() {
            let delta = c * weight;
            match self.0.get_mut(&n) {
                Some(cur) => {
                    debug_assert!(*cur >= delta, "path count underflow at {n}");
                    *cur = cur.saturating_sub(delta);
                    if *cur == 0 {
                        self.0.remove(&n);
                    }
                }
                None => debug_assert!(false, "subtracting absent path count at {n}"),
            }
        }
    }

    /// Copy restricted to the given key set (values stay exact full-graph
    /// counts; only the tracked targets shrink).
    pub fn restricted_to(&self, keys: &BTreeSet<NodeId>) -> PathCountMap {
        PathCountMap(
            self.0
                .iter()
                .filter(|(n, _)| keys.contains(n))
                .map(|(&n, &c)| (n, c))
                .collect(),
        )
    }
}

impl FromIterator<(NodeId, u64)> for PathCountMap {
    fn from_iter<I: IntoIterator<Item = (NodeId, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().filter(|&(_, c)| c > 0).collect())
    }
}
