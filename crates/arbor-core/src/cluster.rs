//! Cluster graphs (junction trees) with cached separators.
//!
//! Each edge's separator is the intersection of the two adjacent clusters'
//! contents. Separators are maintained incrementally on every content edit,
//! never recomputed wholesale.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::id::{ClusterId, NodeId};
use crate::nodeset::NodeSet;

fn edge_key(a: ClusterId, b: ClusterId) -> (ClusterId, ClusterId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterGraph {
    contents: BTreeMap<ClusterId, NodeSet>,
    neighbors: BTreeMap<ClusterId, BTreeSet<ClusterId>>,
    // Tuple keys cannot be JSON object keys, so serialize as an entry list.
    #[serde(with = "separator_entries")]
    separators: BTreeMap<(ClusterId, ClusterId), NodeSet>,
    next_id: u64,
}

mod separator_entries {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<(ClusterId, ClusterId), NodeSet>,
        ser: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let entries: Vec<(&(ClusterId, ClusterId), &NodeSet)> = map.iter().collect();
        entries.serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> std::result::Result<BTreeMap<(ClusterId, ClusterId), NodeSet>, D::Error> {
        let entries: Vec<((ClusterId, ClusterId), NodeSet)> = Vec::deserialize(de)?;
        Ok(entries.into_iter().collect())
    }
}

impl ClusterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a cluster with the given content. No-op if the id is taken.
    pub fn add_cluster(&mut self, id: ClusterId, content: NodeSet) {
        if self.contents.contains_key(&id) {
            return;
        }
        self.contents.insert(id, content);
        self.neighbors.entry(id).or_default();
        self.next_id = self.next_id.max(id.get() + 1);
    }

    /// Inserts a cluster under a fresh id and returns it.
    pub fn add_fresh_cluster(&mut self, content: NodeSet) -> ClusterId {
        let id = ClusterId::new(self.next_id);
        self.add_cluster(id, content);
        id
    }

    /// Removes a cluster and its incident edges. No-op if absent.
    pub fn erase_cluster(&mut self, id: ClusterId) {
        if self.contents.remove(&id).is_none() {
            return;
        }
        let nbrs = self.neighbors.remove(&id).unwrap_or_default();
        for n in nbrs {
            if let Some(set) = self.neighbors.get_mut(&n) {
                set.remove(&id);
            }
            self.separators.remove(&edge_key(id, n));
        }
    }

    /// Links two existing clusters and caches their separator.
    /// No-op if either cluster is unknown or the edge already exists.
    pub fn add_edge(&mut self, a: ClusterId, b: ClusterId) {
        if a == b || !self.contents.contains_key(&a) || !self.contents.contains_key(&b) {
            return;
        }
        let key = edge_key(a, b);
        if self.separators.contains_key(&key) {
            return;
        }
        let sep = self.contents[&a].intersection(&self.contents[&b]);
        self.separators.insert(key, sep);
        if let Some(s) = self.neighbors.get_mut(&a) {
            s.insert(b);
        }
        if let Some(s) = self.neighbors.get_mut(&b) {
            s.insert(a);
        }
    }

    /// Unlinks two clusters. No-op if the edge is absent.
    pub fn erase_edge(&mut self, a: ClusterId, b: ClusterId) {
        if self.separators.remove(&edge_key(a, b)).is_none() {
            return;
        }
        if let Some(s) = self.neighbors.get_mut(&a) {
            s.remove(&b);
        }
        if let Some(s) = self.neighbors.get_mut(&b) {
            s.remove(&a);
        }
    }

    /// Adds a node to a cluster's content, updating every incident
    /// separator in place. No-op if the cluster is unknown.
    pub fn add_to_cluster(&mut self, id: ClusterId, n: NodeId) {
        let Some(content) = self.contents.get_mut(&id) else {
            return;
        };
        if !content.insert(n) {
            return;
        }
        let nbrs: Vec<ClusterId> = self.neighbors[&id].iter().copied().collect();
        for nb in nbrs {
            if self.contents[&nb].contains(n) {
                if let Some(sep) = self.separators.get_mut(&edge_key(id, nb)) {
                    sep.insert(n);
                }
            }
        }
    }

    /// Removes a node from a cluster's content and from every incident
    /// separator. No-op if the cluster is unknown or lacks the node.
    pub fn erase_from_cluster(&mut self, id: ClusterId, n: NodeId) {
        let Some(content) = self.contents.get_mut(&id) else {
            return;
        };
        if !content.remove(n) {
            return;
        }
        let nbrs: Vec<ClusterId> = self.neighbors[&id].iter().copied().collect();
        for nb in nbrs {
            if let Some(sep) = self.separators.get_mut(&edge_key(id, nb)) {
                sep.remove(n);
            }
        }
    }

    pub fn contains_cluster(&self, id: ClusterId) -> bool {
        self.contents.contains_key(&id)
    }

    pub fn exists_edge(&self, a: ClusterId, b: ClusterId) -> bool {
        self.separators.contains_key(&edge_key(a, b))
    }

    pub fn content(&self, id: ClusterId) -> Result<&NodeSet> {
        self.contents.get(&id).ok_or(Error::UnknownCluster(id))
    }

    pub fn separator(&self, a: ClusterId, b: ClusterId) -> Result<&NodeSet> {
        self.separators
            .get(&edge_key(a, b))
            .ok_or(Error::MissingEdge { a, b })
    }

    pub fn neighbors(&self, id: ClusterId) -> Result<impl Iterator<Item = ClusterId> + '_> {
        self.neighbors
            .get(&id)
            .map(|s| s.iter().copied())
            .ok_or(Error::UnknownCluster(id))
    }

    pub fn degree(&self, id: ClusterId) -> Result<usize> {
        self.neighbors
            .get(&id)
            .map(|s| s.len())
            .ok_or(Error::UnknownCluster(id))
    }

    pub fn clusters(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.contents.keys().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = (ClusterId, ClusterId)> + '_ {
        self.separators.keys().copied()
    }

    pub fn cluster_count(&self) -> usize {
        self.contents.len()
    }

    /// Whether, for every variable, the clusters containing it induce a
    /// connected subtree.
    ///
    /// One DFS over each connected component. A variable first met at a
    /// cluster has its whole connected region flooded along separators that
    /// carry it; meeting the variable again outside that region means no
    /// connecting path exists (a stale ledger entry). A variable reappearing
    /// in a different, previously processed component is rejected outright.
    /// Vacuously true for a structurally empty graph.
    pub fn has_running_intersection(&self) -> bool {
        let mut visited: BTreeSet<ClusterId> = BTreeSet::new();
        // Variable -> index of the finished component where it appeared.
        let mut component_of: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut component = 0usize;

        for root in self.contents.keys().copied() {
            if visited.contains(&root) {
                continue;
            }
            // Per-component ledger: variable -> clusters already connected
            // to its first appearance through carrying separators.
            let mut covered: BTreeMap<NodeId, BTreeSet<ClusterId>> = BTreeMap::new();

            let mut stack = vec![root];
            visited.insert(root);
            while let Some(c) = stack.pop() {
                for v in self.contents[&c].iter() {
                    if let Some(&comp) = component_of.get(&v) {
                        if comp != component {
                            return false;
                        }
                    } else {
                        component_of.insert(v, component);
                    }
                    match covered.get(&v) {
                        Some(region) => {
                            // Seen before in this component: the connecting
                            // path must already have reached this cluster.
                            if !region.contains(&c) {
                                return false;
                            }
                        }
                        None => {
                            covered.insert(v, self.flood_carrying(c, v));
                        }
                    }
                }
                for nb in self.neighbors[&c].iter().copied() {
                    if visited.insert(nb) {
                        stack.push(nb);
                    }
                }
            }
            component += 1;
        }
        true
    }

    /// Clusters reachable from `start` along edges whose separator carries
    /// `v`. Includes `start`.
    fn flood_carrying(&self, start: ClusterId, v: NodeId) -> BTreeSet<ClusterId> {
        let mut region = BTreeSet::new();
        region.insert(start);
        let mut stack = vec![start];
        while let Some(c) = stack.pop() {
            for nb in self.neighbors[&c].iter().copied() {
                if region.contains(&nb) {
                    continue;
                }
                let carries = self.separators[&edge_key(c, nb)].contains(v);
                if carries && self.contents[&nb].contains(v) {
                    region.insert(nb);
                    stack.push(nb);
                }
            }
        }
        region
    }
}
