//! Ordered sets of model-variable ids.
//!
//! Separators, cluster contents and barren sets are all `NodeSet`s. The
//! BTreeSet backing keeps iteration order deterministic, which in turn keeps
//! planner output and test assertions deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::id::NodeId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeSet(BTreeSet<NodeId>);

impl NodeSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn insert(&mut self, n: NodeId) -> bool {
        self.0.insert(n)
    }

    pub fn remove(&mut self, n: NodeId) -> bool {
        self.0.remove(&n)
    }

    pub fn contains(&self, n: NodeId) -> bool {
        self.0.contains(&n)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.iter().copied()
    }

    pub fn union(&self, other: &NodeSet) -> NodeSet {
        NodeSet(self.0.union(&other.0).copied().collect())
    }

    pub fn intersection(&self, other: &NodeSet) -> NodeSet {
        NodeSet(self.0.intersection(&other.0).copied().collect())
    }

    pub fn difference(&self, other: &NodeSet) -> NodeSet {
        NodeSet(self.0.difference(&other.0).copied().collect())
    }

    pub fn is_subset(&self, other: &NodeSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_disjoint(&self, other: &NodeSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn extend_from(&mut self, other: &NodeSet) {
        self.0.extend(other.iter());
    }
}

impl FromIterator<NodeId> for NodeSet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[NodeId; N]> for NodeSet {
    fn from(arr: [NodeId; N]) -> Self {
        arr.into_iter().collect()
    }
}

impl fmt::Display for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, n) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", n.get())?;
        }
        write!(f, "}}")
    }
}
