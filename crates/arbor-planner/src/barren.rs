//! Barren-node detection.
//!
//! For each junction-tree edge and direction, finds the members of the
//! sending cluster that cannot influence the message: nodes that are
//! neither observed, nor ancestors of an observed node, nor ancestors of a
//! separator node the message is queried through. Those can be summed out
//! before the message is ever computed.
//!
//! Ancestor closures are shared across query targets through a heuristic
//! path cover: targets chained along DAG arcs are swept root to end with a
//! generation counter, so marking work is reused along each chain. An
//! exact minimum path cover would change nothing externally.

use std::collections::BTreeMap;

use tracing::debug;

use arbor_core::{ClusterGraph, ClusterId, DirectedGraph, NodeId, NodeSet, Result};

/// Per-message barren sets, keyed by (sending cluster, receiving cluster).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarrenResult {
    messages: BTreeMap<(ClusterId, ClusterId), NodeSet>,
}

impl BarrenResult {
    pub fn get(&self, source: ClusterId, destination: ClusterId) -> Option<&NodeSet> {
        self.messages.get(&(source, destination))
    }

    pub fn iter(&self) -> impl Iterator<Item = ((ClusterId, ClusterId), &NodeSet)> + '_ {
        self.messages.iter().map(|(&k, v)| (k, v))
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

pub struct BarrenNodeFinder<'a> {
    dag: &'a DirectedGraph,
    tree: &'a ClusterGraph,
    observed: NodeSet,
}

impl<'a> BarrenNodeFinder<'a> {
    pub fn new(dag: &'a DirectedGraph, tree: &'a ClusterGraph, observed: NodeSet) -> Self {
        Self {
            dag,
            tree,
            observed,
        }
    }

    /// Computes the barren set of every directed message in the tree.
    ///
    /// An observed node, or any DAG-ancestor of one, never appears in any
    /// returned set.
    pub fn barren_nodes(&self) -> Result<BarrenResult> {
        // Observed nodes and their ancestors are never barren.
        let mut non_barren = self.dag.ancestors_of(&self.observed);
        non_barren.extend_from(&self.observed);

        // Seed: everything in the sender that is neither protected nor
        // carried by the separator is tentatively barren.
        let mut tentative: BTreeMap<(ClusterId, ClusterId), NodeSet> = BTreeMap::new();
        let mut targets: BTreeMap<NodeId, Vec<(ClusterId, ClusterId)>> = BTreeMap::new();
        for (a, b) in self.tree.edges() {
            let sep = self.tree.separator(a, b)?.clone();
            for (src, dst) in [(a, b), (b, a)] {
                let seed = self
                    .tree
                    .content(src)?
                    .difference(&non_barren)
                    .difference(&sep);
                if !seed.is_empty() {
                    // The message is queried through its separator nodes:
                    // each one becomes a downstream target for this edge.
                    for v in sep.iter() {
                        targets.entry(v).or_default().push((src, dst));
                    }
                }
                tentative.insert((src, dst), seed);
            }
        }

        if !targets.is_empty() {
            self.sweep_path_cover(&mut tentative, &targets);
        }

        debug!(
            messages = tentative.len(),
            observed = self.observed.len(),
            "computed barren sets"
        );
        Ok(BarrenResult {
            messages: tentative,
        })
    }

    /// Chains the query targets' ancestor subgraph into near-disjoint
    /// paths, then sweeps each chain with a rising generation counter,
    /// marking ancestor closures and clearing tentative entries that turn
    /// out to be relevant.
    fn sweep_path_cover(
        &self,
        tentative: &mut BTreeMap<(ClusterId, ClusterId), NodeSet>,
        targets: &BTreeMap<NodeId, Vec<(ClusterId, ClusterId)>>,
    ) {
        let queried: NodeSet = targets.keys().copied().collect();
        let mut relevant = self.dag.ancestors_of(&queried);
        relevant.extend_from(&queried);

        // Greedy matching: each node keeps at most one chain predecessor
        // and one chain successor among its DAG neighbors.
        let mut succ: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut pred: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for v in relevant.iter() {
            if succ.contains_key(&v) {
                continue;
            }
            let Ok(children) = self.dag.children(v) else {
                continue;
            };
            for c in children.iter() {
                if relevant.contains(c) && !pred.contains_key(&c) {
                    succ.insert(v, c);
                    pred.insert(c, v);
                    break;
                }
            }
        }

        let mut mark: BTreeMap<NodeId, u64> = BTreeMap::new();
        let mut generation: u64 = 0;
        for root in relevant.iter().filter(|v| !pred.contains_key(v)) {
            let mut v = root;
            loop {
                generation += 1;
                self.mark_ancestors(v, generation, &mut mark);
                if let Some(edges) = targets.get(&v) {
                    for &edge in edges {
                        if let Some(seed) = tentative.get_mut(&edge) {
                            let drop: Vec<NodeId> = seed
                                .iter()
                                .filter(|&n| mark.get(&n).copied().unwrap_or(0) >= generation)
                                .collect();
                            for n in drop {
                                seed.remove(n);
                            }
                        }
                    }
                }
                match succ.get(&v) {
                    Some(&next) => v = next,
                    None => break,
                }
            }
        }
    }

    /// Marks `v` and all its DAG-ancestors with `generation`, skipping
    /// nodes already at that generation or later.
    fn mark_ancestors(&self, v: NodeId, generation: u64, mark: &mut BTreeMap<NodeId, u64>) {
        let mut stack = vec![v];
        while let Some(u) = stack.pop() {
            if mark.get(&u).copied().unwrap_or(0) >= generation {
                continue;
            }
            mark.insert(u, generation);
            if let Ok(parents) = self.dag.parents(u) {
                for p in parents.iter() {
                    stack.push(p);
                }
            }
        }
    }
}
