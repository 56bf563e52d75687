//! The oracle proper: a mirrored DAG plus per-node ancestor/descendant
//! path-count maps, updated incrementally on every committed edit.
//!
//! All updates are compute-then-commit: deltas are snapshotted before any
//! map is touched, so a failed precondition never leaves partial state.

use std::collections::{BTreeMap, VecDeque};

use arbor_core::{DirectedGraph, Error, NodeId, Result};

use crate::counts::PathCountMap;

#[derive(Debug, Clone, Default)]
pub struct AcyclicityOracle {
    dag: DirectedGraph,
    ancestors: BTreeMap<NodeId, PathCountMap>,
    descendants: BTreeMap<NodeId, PathCountMap>,
}

impl AcyclicityOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the mirror and both count maps from scratch.
    ///
    /// Sweeps topologically from the roots, propagating each node's
    /// ancestor counts (plus itself) additively to its children; then the
    /// symmetric sweep from the leaves for descendants. This is the only
    /// wholesale recomputation; every later edit is incremental.
    pub fn set_dag(&mut self, dag: &DirectedGraph) {
        self.dag = dag.clone();
        self.ancestors.clear();
        self.descendants.clear();
        for n in self.dag.nodes() {
            self.ancestors.insert(n, PathCountMap::new());
            self.descendants.insert(n, PathCountMap::new());
        }

        for n in self.topological_order() {
            let parents = self.dag.parents(n).map(|p| p.clone()).unwrap_or_default();
            let mut anc = PathCountMap::new();
            for p in parents.iter() {
                anc.add_scaled(&self.ancestors[&p], 1);
                anc.increment(p, 1);
            }
            self.ancestors.insert(n, anc);
        }
        for n in self.topological_order().into_iter().rev() {
            let children = self.dag.children(n).map(|c| c.clone()).unwrap_or_default();
            let mut desc = PathCountMap::new();
            for c in children.iter() {
                desc.add_scaled(&self.descendants[&c], 1);
                desc.increment(c, 1);
            }
            self.descendants.insert(n, desc);
        }
    }

    /// Read access to the mirrored structure.
    pub fn dag(&self) -> &DirectedGraph {
        &self.dag
    }

    pub fn ancestor_counts(&self, n: NodeId) -> Result<&PathCountMap> {
        self.ancestors.get(&n).ok_or(Error::UnknownNode(n))
    }

    pub fn descendant_counts(&self, n: NodeId) -> Result<&PathCountMap> {
        self.descendants.get(&n).ok_or(Error::UnknownNode(n))
    }

    /// Registers a fresh isolated node in the mirror. No-op if present.
    pub fn add_node(&mut self, n: NodeId) {
        if !self.dag.contains_node(n) {
            self.dag.add_node(n);
            self.ancestors.insert(n, PathCountMap::new());
            self.descendants.insert(n, PathCountMap::new());
        }
    }

    /// Commits an arc. No-op if the arc already exists; fails with
    /// [`Error::Cycle`] when `head` is already an ancestor of `tail`.
    pub fn add_arc(&mut self, tail: NodeId, head: NodeId) -> Result<()> {
        self.check_known(tail)?;
        self.check_known(head)?;
        if self.dag.exists_arc(tail, head) {
            return Ok(());
        }
        if tail == head || self.ancestors[&tail].contains(head) {
            return Err(Error::Cycle { tail, head });
        }

        // Every new path x -> d runs x ->* tail -> head ->* d, so the count
        // delta factors into paths(x -> tail) * paths(head -> d).
        let mut reach_tail = self.ancestors[&tail].clone();
        reach_tail.increment(tail, 1);
        let mut reach_head = self.descendants[&head].clone();
        reach_head.increment(head, 1);

        let anc_targets: Vec<(NodeId, u64)> =
            std::iter::once((head, 1)).chain(self.descendants[&head].iter()).collect();
        let desc_targets: Vec<(NodeId, u64)> =
            std::iter::once((tail, 1)).chain(self.ancestors[&tail].iter()).collect();

        self.dag.add_arc(tail, head);
        for (d, w) in anc_targets {
            if let Some(map) = self.ancestors.get_mut(&d) {
                map.add_scaled(&reach_tail, w);
            }
        }
        for (a, w) in desc_targets {
            if let Some(map) = self.descendants.get_mut(&a) {
                map.add_scaled(&reach_head, w);
            }
        }
        Ok(())
    }

    /// Removes an arc, subtracting exactly the weighted sets an equivalent
    /// addition would have added. No-op if the arc is absent.
    ///
    /// Correct because the counts are exact path multiplicities: no path
    /// x ->* tail can use the arc tail -> head (that would close a cycle),
    /// so the deltas computed from the current maps equal the addition's.
    pub fn erase_arc(&mut self, tail: NodeId, head: NodeId) {
        if !self.dag.exists_arc(tail, head) {
            return;
        }

        let mut reach_tail = self.ancestors[&tail].clone();
        reach_tail.increment(tail, 1);
        let mut reach_head = self.descendants[&head].clone();
        reach_head.increment(head, 1);

        let anc_targets: Vec<(NodeId, u64)> =
            std::iter::once((head, 1)).chain(self.descendants[&head].iter()).collect();
        let desc_targets: Vec<(NodeId, u64)> =
            std::iter::once((tail, 1)).chain(self.ancestors[&tail].iter()).collect();

        self.dag.erase_arc(tail, head);
        for (d, w) in anc_targets {
            if let Some(map) = self.ancestors.get_mut(&d) {
                map.sub_scaled(&reach_tail, w);
            }
        }
        for (a, w) in desc_targets {
            if let Some(map) = self.descendants.get_mut(&a) {
                map.sub_scaled(&reach_head, w);
            }
        }
    }

    /// Commits a reversal, vetting it first. Implemented as erase + add.
    pub fn reverse_arc(&mut self, tail: NodeId, head: NodeId) -> Result<()> {
        if self.would_create_cycle_on_reversal(tail, head)? {
            return Err(Error::Cycle { tail: head, head: tail });
        }
        self.erase_arc(tail, head);
        self.add_arc(head, tail)
    }

    /// Whether committing `tail -> head` would close a directed cycle.
    pub fn would_create_cycle_on_addition(&self, tail: NodeId, head: NodeId) -> Result<bool> {
        self.check_known(tail)?;
        self.check_known(head)?;
        if tail == head {
            return Ok(true);
        }
        if self.dag.exists_arc(tail, head) {
            // Committing would be a no-op.
            return Ok(false);
        }
        Ok(self.ancestors[&tail].contains(head))
    }

    /// Deletions never close a cycle; this only validates the endpoints.
    pub fn would_create_cycle_on_deletion(&self, tail: NodeId, head: NodeId) -> Result<bool> {
        self.check_known(tail)?;
        self.check_known(head)?;
        Ok(false)
    }

    /// Whether reversing `tail -> head` would close a cycle, i.e. whether a
    /// directed path tail ->* head survives besides the arc itself.
    pub fn would_create_cycle_on_reversal(&self, tail: NodeId, head: NodeId) -> Result<bool> {
        self.check_known(tail)?;
        self.check_known(head)?;
        if tail == head {
            return Ok(true);
        }
        if self.dag.exists_arc(tail, head) {
            Ok(self.ancestors[&head].count(tail) > 1)
        } else {
            // No arc to remove; behaves like a plain addition of head -> tail.
            Ok(self.ancestors[&head].contains(tail))
        }
    }

    fn check_known(&self, n: NodeId) -> Result<()> {
        if self.dag.contains_node(n) {
            Ok(())
        } else {
            Err(Error::UnknownNode(n))
        }
    }

    fn topological_order(&self) -> Vec<NodeId> {
        let mut in_degree: BTreeMap<NodeId, usize> = BTreeMap::new();
        for n in self.dag.nodes() {
            let deg = self.dag.parents(n).map(|p| p.len()).unwrap_or(0);
            in_degree.insert(n, deg);
        }
        let mut ready: VecDeque<NodeId> = in_degree
            .iter()
            .filter_map(|(&n, &d)| (d == 0).then_some(n))
            .collect();
        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(n) = ready.pop_front() {
            order.push(n);
            if let Ok(children) = self.dag.children(n) {
                for c in children.iter() {
                    if let Some(d) = in_degree.get_mut(&c) {
                        *d -= 1;
                        if *d == 0 {
                            ready.push_back(c);
                        }
                    }
                }
            }
        }
        debug_assert_eq!(order.len(), in_degree.len(), "mirror contains a cycle");
        order
    }
}
