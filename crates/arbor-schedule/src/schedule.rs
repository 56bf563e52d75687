//! A whole deferred plan: tables, operators, topological execution,
//! aggregate cost estimation, and duplicate detection.

use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use tracing::debug;

use arbor_core::{OpId, TableId};

use crate::error::{Result, ScheduleError};
use crate::operator::{CombineFn, MemoryDelta, OpKind, ProjectFn, ScheduleOperator};
use crate::table::{Dim, ScheduleTable, TableStore, Tabular};

/// How strongly two operators duplicate each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    /// Same variant over the very same input identities.
    Identical,
    /// Inputs are distinct tables with equal content.
    SameArguments,
    /// Inputs only share their label sets (shape-compatible).
    SimilarArguments,
}

/// One inference request's operation plan. Built entirely before anything
/// is materialized; executed once in topological order; then torn down.
#[derive(Debug, Default)]
pub struct Schedule<T> {
    store: TableStore<T>,
    ops: Vec<ScheduleOperator<T>>,
    next_op: u64,
}

impl<T: Tabular> Schedule<T> {
    pub fn new() -> Self {
        Self {
            store: TableStore::new(),
            ops: Vec::new(),
            next_op: 0,
        }
    }

    pub fn new_table(&mut self, dims: Vec<Dim>, persistent: bool) -> TableId {
        self.store.create(dims, persistent)
    }

    pub fn supply(&mut self, id: TableId, value: T) -> Result<()> {
        self.store.supply(id, value)
    }

    pub fn table(&self, id: TableId) -> Result<&ScheduleTable<T>> {
        self.store.get(id)
    }

    pub fn store(&self) -> &TableStore<T> {
        &self.store
    }

    pub fn combine(&mut self, left: TableId, right: TableId, f: CombineFn<T>) -> Result<OpId> {
        let id = self.fresh_op_id();
        let op = ScheduleOperator::combine(id, &mut self.store, left, right, f)?;
        self.ops.push(op);
        Ok(id)
    }

    pub fn project(
        &mut self,
        arg: TableId,
        dropped: BTreeSet<String>,
        f: ProjectFn<T>,
    ) -> Result<OpId> {
        let id = self.fresh_op_id();
        let op = ScheduleOperator::project(id, &mut self.store, arg, dropped, f)?;
        self.ops.push(op);
        Ok(id)
    }

    pub fn delete(&mut self, arg: TableId) -> Result<OpId> {
        let id = self.fresh_op_id();
        let op = ScheduleOperator::delete(id, &self.store, arg)?;
        self.ops.push(op);
        Ok(id)
    }

    pub fn operator(&self, id: OpId) -> Result<&ScheduleOperator<T>> {
        self.ops
            .iter()
            .find(|op| op.id() == id)
            .ok_or(ScheduleError::UnknownOperator)
    }

    pub fn result_of(&self, id: OpId) -> Result<Option<TableId>> {
        Ok(self.operator(id)?.result())
    }

    pub fn operators(&self) -> impl Iterator<Item = &ScheduleOperator<T>> {
        self.ops.iter()
    }

    /// Executes one operator by id, out of band.
    pub fn execute_op(&mut self, id: OpId) -> Result<()> {
        let idx = self.index_of(id)?;
        self.ops[idx].execute(&mut self.store)
    }

    /// Undoes one operator by id.
    pub fn undo_op(&mut self, id: OpId) -> Result<()> {
        let idx = self.index_of(id)?;
        self.ops[idx].undo(&mut self.store)
    }

    /// Rewrites one operator's argument tables, slot for slot. Used when a
    /// duplicate operator's result is substituted for a planned input.
    pub fn update_op_args(&mut self, id: OpId, new_args: &[TableId]) -> Result<()> {
        let idx = self.index_of(id)?;
        self.ops[idx].update_args(new_args, &self.store)
    }

    /// Topological order over the plan: producers before consumers, and
    /// every Delete after the last other consumer of its argument.
    pub fn execution_order(&self) -> Result<Vec<OpId>> {
        let n = self.ops.len();
        let mut producer_of: BTreeMap<TableId, usize> = BTreeMap::new();
        for (i, op) in self.ops.iter().enumerate() {
            if let Some(r) = op.result() {
                producer_of.insert(r, i);
            }
        }

        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut add_edge = |from: usize, to: usize, in_degree: &mut Vec<usize>| {
            dependents[from].push(to);
            in_degree[to] += 1;
        };
        for (i, op) in self.ops.iter().enumerate() {
            for arg in op.args() {
                if let Some(&p) = producer_of.get(&arg) {
                    if p != i {
                        add_edge(p, i, &mut in_degree);
                    }
                }
            }
            if let OpKind::Delete { arg } = op.kind() {
                for (j, other) in self.ops.iter().enumerate() {
                    if j != i && other.args().contains(arg) {
                        add_edge(j, i, &mut in_degree);
                    }
                }
            }
        }

        // Min-heap on insertion index keeps the order deterministic.
        let mut ready: BinaryHeap<std::cmp::Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter_map(|(i, &d)| (d == 0).then_some(std::cmp::Reverse(i)))
            .collect();
        let mut order = Vec::with_capacity(n);
        while let Some(std::cmp::Reverse(i)) = ready.pop() {
            order.push(self.ops[i].id());
            for &j in &dependents[i] {
                in_degree[j] -= 1;
                if in_degree[j] == 0 {
                    ready.push(std::cmp::Reverse(j));
                }
            }
        }
        if order.len() != n {
            return Err(ScheduleError::CyclicPlan);
        }
        Ok(order)
    }

    /// Executes the whole plan in topological order. Non-persistent tables
    /// are released as soon as their last consumer has run.
    pub fn execute_all(&mut self) -> Result<()> {
        let order = self.execution_order()?;
        let mut remaining: BTreeMap<TableId, usize> = BTreeMap::new();
        for op in &self.ops {
            if op.is_executed() {
                continue;
            }
            for arg in op.args() {
                *remaining.entry(arg).or_insert(0) += 1;
            }
        }

        for id in &order {
            let idx = self.index_of(*id)?;
            if self.ops[idx].is_executed() {
                continue;
            }
            self.ops[idx].execute(&mut self.store)?;
            for arg in self.ops[idx].args() {
                let Some(count) = remaining.get_mut(&arg) else {
                    continue;
                };
                *count -= 1;
                if *count == 0 && !self.store.get(arg)?.is_persistent() {
                    self.store.release(arg)?;
                }
            }
        }
        debug!(operators = order.len(), "executed schedule");
        Ok(())
    }

    /// Total estimated table-cell operations across the plan.
    pub fn nb_operations(&self) -> Result<u64> {
        let mut total = 0u64;
        for op in &self.ops {
            total = total.saturating_add(op.nb_operations(&self.store)?);
        }
        Ok(total)
    }

    /// Simulates the plan in execution order and reports the peak and
    /// final number of live cells. Estimated purely from label domain
    /// sizes; nothing is materialized.
    pub fn memory_usage(&self) -> Result<MemoryDelta> {
        let order = self.execution_order()?;
        let mut live: i64 = 0;
        for id in self.store.ids() {
            let t = self.store.get(id)?;
            if !t.is_abstract() {
                live += t.cells().min(i64::MAX as u64) as i64;
            }
        }
        let mut peak = live;

        let mut remaining: BTreeMap<TableId, usize> = BTreeMap::new();
        for op in &self.ops {
            for arg in op.args() {
                *remaining.entry(arg).or_insert(0) += 1;
            }
        }
        for id in &order {
            let op = self.operator(*id)?;
            let delta = op.memory_usage(&self.store)?;
            peak = peak.max(live + delta.peak_cells.min(i64::MAX as u64) as i64);
            live += delta.residual_cells;
            // A Delete's own delta already removes its argument's cells.
            let is_delete = matches!(op.kind(), OpKind::Delete { .. });
            for arg in op.args() {
                if let Some(count) = remaining.get_mut(&arg) {
                    *count -= 1;
                    let table = self.store.get(arg)?;
                    if *count == 0 && !table.is_persistent() && !is_delete {
                        live -= table.cells().min(i64::MAX as u64) as i64;
                    }
                }
            }
            live = live.max(0);
            peak = peak.max(live);
        }
        Ok(MemoryDelta {
            peak_cells: peak.max(0) as u64,
            residual_cells: live,
        })
    }

    /// Reports duplicate operator pairs, strongest tier first per pair:
    /// identical inputs, equal-content inputs, or merely shape-compatible
    /// inputs. Feed for a plan-rewriting pass.
    pub fn find_duplicates(&self) -> Result<Vec<(OpId, OpId, DuplicateKind)>> {
        let mut out = Vec::new();
        for i in 0..self.ops.len() {
            for j in (i + 1)..self.ops.len() {
                let a = &self.ops[i];
                let b = &self.ops[j];
                let kind = if a.same_identity(b) {
                    Some(DuplicateKind::Identical)
                } else if a.has_same_arguments(b, &self.store)? {
                    Some(DuplicateKind::SameArguments)
                } else if a.has_similar_arguments(b, &self.store)? {
                    Some(DuplicateKind::SimilarArguments)
                } else {
                    None
                };
                if let Some(kind) = kind {
                    out.push((a.id(), b.id(), kind));
                }
            }
        }
        Ok(out)
    }

    fn fresh_op_id(&mut self) -> OpId {
        let id = OpId::new(self.next_op);
        self.next_op += 1;
        id
    }

    fn index_of(&self, id: OpId) -> Result<usize> {
        self.ops
            .iter()
            .position(|op| op.id() == id)
            .ok_or(ScheduleError::UnknownOperator)
    }
}
