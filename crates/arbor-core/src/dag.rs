//! Directed-graph container for graphical-model structure.
//!
//! This is a plain adjacency container: it never checks for cycles itself.
//! Acyclicity is an invariant maintained by the oracle crate, which owns a
//! mirror of the caller's structure and vets every edit before it is
//! committed here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::id::NodeId;
use crate::nodeset::NodeSet;

/// A directed pair over model variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArcEdge {
    pub tail: NodeId,
    pub head: NodeId,
}

impl ArcEdge {
    pub fn new(tail: NodeId, head: NodeId) -> Self {
        Self { tail, head }
    }
}

/// Nodes plus directed arcs, with parent/child adjacency on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectedGraph {
    parents: BTreeMap<NodeId, NodeSet>,
    children: BTreeMap<NodeId, NodeSet>,
}

impl DirectedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an isolated node. No-op if the node already exists.
    pub fn add_node(&mut self, n: NodeId) {
        self.parents.entry(n).or_default();
        self.children.entry(n).or_default();
    }

    /// Removes a node and every arc incident to it. No-op if absent.
    pub fn erase_node(&mut self, n: NodeId) {
        let Some(ps) = self.parents.remove(&n) else {
            return;
        };
        let cs = self.children.remove(&n).unwrap_or_default();
        for p in ps.iter() {
            if let Some(set) = self.children.get_mut(&p) {
                set.remove(n);
            }
        }
        for c in cs.iter() {
            if let Some(set) = self.parents.get_mut(&c) {
                set.remove(n);
            }
        }
    }

    /// Inserts an arc, creating missing endpoints. No-op if already present.
    pub fn add_arc(&mut self, tail: NodeId, head: NodeId) {
        self.add_node(tail);
        self.add_node(head);
        if let Some(s) = self.children.get_mut(&tail) {
            s.insert(head);
        }
        if let Some(s) = self.parents.get_mut(&head) {
            s.insert(tail);
        }
    }

    /// Removes an arc. No-op if absent.
    pub fn erase_arc(&mut self, tail: NodeId, head: NodeId) {
        if let Some(set) = self.children.get_mut(&tail) {
            set.remove(head);
        }
        if let Some(set) = self.parents.get_mut(&head) {
            set.remove(tail);
        }
    }

    pub fn contains_node(&self, n: NodeId) -> bool {
        self.parents.contains_key(&n)
    }

    pub fn exists_arc(&self, tail: NodeId, head: NodeId) -> bool {
        self.children
            .get(&tail)
            .map(|s| s.contains(head))
            .unwrap_or(false)
    }

    pub fn parents(&self, n: NodeId) -> Result<&NodeSet> {
        self.parents.get(&n).ok_or(Error::UnknownNode(n))
    }

    pub fn children(&self, n: NodeId) -> Result<&NodeSet> {
        self.children.get(&n).ok_or(Error::UnknownNode(n))
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.parents.keys().copied()
    }

    pub fn arcs(&self) -> impl Iterator<Item = ArcEdge> + '_ {
        self.children.iter().flat_map(|(&tail, heads)| {
            heads.iter().map(move |head| ArcEdge::new(tail, head))
        })
    }

    pub fn node_count(&self) -> usize {
        self.parents.len()
    }

    pub fn arc_count(&self) -> usize {
        self.children.values().map(|s| s.len()).sum()
    }

    /// All ancestors of `seed` nodes (the seeds themselves excluded unless
    /// reachable), via reverse breadth-first traversal.
    pub fn ancestors_of(&self, seed: &NodeSet) -> NodeSet {
        let mut out = NodeSet::new();
        let mut stack: Vec<NodeId> = seed.iter().collect();
        while let Some(n) = stack.pop() {
            if let Some(ps) = self.parents.get(&n) {
                for p in ps.iter() {
                    if out.insert(p) {
                        stack.push(p);
                    }
                }
            }
        }
        out
    }
}
