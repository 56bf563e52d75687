//! Coarse table-size cost model used by the planners.
//!
//! A cluster's cost is the product of its members' domain sizes: the size
//! of the table a message over that cluster would materialize. Computed in
//! u128 with saturation so pathological domains cannot wrap.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use arbor_core::{NodeId, NodeSet};

/// Per-variable domain cardinalities.
///
/// Variables without a configured size default to 2 (binary), the coarsest
/// still-useful guess for ranking separator pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainSizes(BTreeMap<NodeId, u64>);

pub const DEFAULT_DOMAIN_SIZE: u64 = 2;

impl DomainSizes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, n: NodeId, size: u64) {
        self.0.insert(n, size.max(1));
    }

    pub fn size(&self, n: NodeId) -> u64 {
        self.0.get(&n).copied().unwrap_or(DEFAULT_DOMAIN_SIZE)
    }

    /// Size of the table spanning exactly `set`.
    pub fn product(&self, set: &NodeSet) -> u128 {
        let mut acc: u128 = 1;
        for n in set.iter() {
            acc = acc.saturating_mul(self.size(n) as u128);
        }
        acc
    }
}

impl FromIterator<(NodeId, u64)> for DomainSizes {
    fn from_iter<I: IntoIterator<Item = (NodeId, u64)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (n, s) in iter {
            out.set(n, s);
        }
        out
    }
}
