//! Binary join tree construction.
//!
//! Rewrites a cluster graph so that every non-root cluster keeps at most
//! three neighbors, which makes every combination during message passing
//! pairwise. Over-degree clusters have their neighbor pairs merged behind
//! synthetic clusters, cheapest separator union first, so the introduced
//! tables stay as small as the greedy choice allows.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, BTreeSet};

use tracing::debug;

use arbor_core::{ClusterGraph, ClusterId, Error, Result};

use crate::cost::DomainSizes;

/// Output of a conversion: the rewritten graph plus the effective root of
/// each connected component.
#[derive(Debug, Clone)]
pub struct BinaryPlan {
    pub tree: ClusterGraph,
    pub roots: Vec<ClusterId>,
}

pub struct BinaryJoinTreePlanner;

impl BinaryJoinTreePlanner {
    /// Rewrites `tree` into a binary join tree. The input is left
    /// untouched.
    ///
    /// Explicit `roots` are validated: naming two roots inside one
    /// connected component is a [`Error::MultipleRoots`]; a component with
    /// no explicit root gets its smallest cluster id as root.
    pub fn convert(
        tree: &ClusterGraph,
        sizes: &DomainSizes,
        roots: &[ClusterId],
    ) -> Result<BinaryPlan> {
        for &r in roots {
            if !tree.contains_cluster(r) {
                return Err(Error::UnknownCluster(r));
            }
        }

        let mut out = tree.clone();
        let explicit: BTreeSet<ClusterId> = roots.iter().copied().collect();
        let mut effective_roots = Vec::new();

        let mut seen: BTreeSet<ClusterId> = BTreeSet::new();
        for start in tree.clusters() {
            if seen.contains(&start) {
                continue;
            }
            // Collect this component before any rewiring.
            let mut component = vec![start];
            seen.insert(start);
            let mut i = 0;
            while i < component.len() {
                let c = component[i];
                for n in tree.neighbors(c)? {
                    if seen.insert(n) {
                        component.push(n);
                    }
                }
                i += 1;
            }

            let mut root = None;
            for &c in &component {
                if explicit.contains(&c) {
                    match root {
                        None => root = Some(c),
                        Some(first) => {
                            return Err(Error::MultipleRoots { first, second: c })
                        }
                    }
                }
            }
            // component[0] is the smallest id: clusters() iterates in order.
            let root = root.unwrap_or(component[0]);
            effective_roots.push(root);

            let mut visited = BTreeSet::new();
            visit(&mut out, sizes, root, None, &mut visited)?;
        }

        Ok(BinaryPlan {
            tree: out,
            roots: effective_roots,
        })
    }
}

/// Post-order traversal: children first, so a cluster's own neighbor list
/// is already binary-safe when its turn comes.
fn visit(
    out: &mut ClusterGraph,
    sizes: &DomainSizes,
    c: ClusterId,
    from: Option<ClusterId>,
    visited: &mut BTreeSet<ClusterId>,
) -> Result<()> {
    visited.insert(c);
    let nbrs: Vec<ClusterId> = out.neighbors(c)?.collect();
    for n in nbrs {
        if !visited.contains(&n) {
            visit(out, sizes, n, Some(c), visited)?;
        }
    }
    binarize_cluster(out, sizes, c, from)
}

/// Reduces `c`'s active neighbor count (neighbors other than `from`) to at
/// most 2 (3 when `c` is a root) by pairing neighbors behind synthetic
/// clusters, cheapest separator union first.
fn binarize_cluster(
    out: &mut ClusterGraph,
    sizes: &DomainSizes,
    c: ClusterId,
    from: Option<ClusterId>,
) -> Result<()> {
    let limit = if from.is_none() { 3 } else { 2 };
    let mut active: BTreeSet<ClusterId> = out
        .neighbors(c)?
        .filter(|&n| Some(n) != from)
        .collect();
    if active.len() <= limit {
        return Ok(());
    }

    // Min-heap over (cost, pair); stale entries are skipped on pop.
    let mut heap: BinaryHeap<Reverse<(u128, ClusterId, ClusterId)>> = BinaryHeap::new();
    let actives: Vec<ClusterId> = active.iter().copied().collect();
    for (i, &ni) in actives.iter().enumerate() {
        for &nj in &actives[i + 1..] {
            heap.push(Reverse((pair_cost(out, sizes, c, ni, nj)?, ni, nj)));
        }
    }

    while active.len() > limit {
        let Some(Reverse((cost, ni, nj))) = heap.pop() else {
            break;
        };
        if !active.contains(&ni) || !active.contains(&nj) {
            continue;
        }

        let content = out.separator(ni, c)?.union(out.separator(nj, c)?);
        let r = out.add_fresh_cluster(content);
        out.add_edge(r, ni);
        out.add_edge(r, nj);
        out.add_edge(r, c);
        out.erase_edge(ni, c);
        out.erase_edge(nj, c);
        active.remove(&ni);
        active.remove(&nj);
        debug!(cluster = %c, left = %ni, right = %nj, synthetic = %r, cost = %cost, "merged neighbor pair");

        for &n in &active {
            heap.push(Reverse((pair_cost(out, sizes, c, r, n)?, r, n)));
        }
        active.insert(r);
    }
    Ok(())
}

fn pair_cost(
    out: &ClusterGraph,
    sizes: &DomainSizes,
    c: ClusterId,
    ni: ClusterId,
    nj: ClusterId,
) -> Result<u128> {
    let union = out.separator(ni, c)?.union(out.separator(nj, c)?);
    Ok(sizes.product(&union))
}
