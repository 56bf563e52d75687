//! Deferred operators over schedule tables.
//!
//! An operator references its inputs by table id and never mutates them:
//! Combine and Project always allocate a fresh result, and only Delete
//! changes an argument's own state. Each operator carries enough shape
//! information to be costed while every table involved is still abstract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use tracing::trace;

use arbor_core::{OpId, TableId};

use crate::error::{Result, ScheduleError};
use crate::table::{Dim, TableStore, Tabular};

/// Combination function reference supplied by the concrete table type.
pub type CombineFn<T> = fn(&T, &T) -> T;
/// Projection function reference; the set holds the labels to drop.
pub type ProjectFn<T> = fn(&T, &BTreeSet<String>) -> T;

/// Estimated memory effect of executing one operator, in table cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDelta {
    /// Extra cells live at the operator's peak.
    pub peak_cells: u64,
    /// Net change in live cells once the operator has run.
    pub residual_cells: i64,
}

#[derive(Debug, Clone)]
pub enum OpKind<T> {
    Combine {
        left: TableId,
        right: TableId,
        f: CombineFn<T>,
    },
    Project {
        arg: TableId,
        dropped: BTreeSet<String>,
        f: ProjectFn<T>,
    },
    Delete {
        arg: TableId,
    },
}

#[derive(Debug, Clone)]
pub struct ScheduleOperator<T> {
    id: OpId,
    kind: OpKind<T>,
    result: Option<TableId>,
    executed: bool,
}

impl<T: Tabular> ScheduleOperator<T> {
    /// Plans a combination. The inputs must be compatible: any label they
    /// share must have the same domain size on both sides. The result
    /// table (labels = left ∪ right) is registered abstract in the store.
    pub fn combine(
        id: OpId,
        store: &mut TableStore<T>,
        left: TableId,
        right: TableId,
        f: CombineFn<T>,
    ) -> Result<Self> {
        let ldims = store.get(left)?.dims().to_vec();
        let rdims = store.get(right)?.dims().to_vec();
        let mut dims = ldims.clone();
        for rd in &rdims {
            match ldims.iter().find(|ld| ld.label == rd.label) {
                Some(ld) if ld.size != rd.size => {
                    return Err(ScheduleError::Incompatible(format!(
                        "label '{}' has domain {} on the left but {} on the right",
                        rd.label, ld.size, rd.size
                    )));
                }
                Some(_) => {}
                None => dims.push(rd.clone()),
            }
        }
        let result = store.create(dims, false);
        Ok(Self {
            id,
            kind: OpKind::Combine { left, right, f },
            result: Some(result),
            executed: false,
        })
    }

    /// Plans a projection. Dropped labels absent from the argument are
    /// ignored, not an error; result labels = argument labels minus
    /// `dropped`.
    pub fn project(
        id: OpId,
        store: &mut TableStore<T>,
        arg: TableId,
        dropped: BTreeSet<String>,
        f: ProjectFn<T>,
    ) -> Result<Self> {
        let dims: Vec<Dim> = store
            .get(arg)?
            .dims()
            .iter()
            .filter(|d| !dropped.contains(&d.label))
            .cloned()
            .collect();
        let result = store.create(dims, false);
        Ok(Self {
            id,
            kind: OpKind::Project { arg, dropped, f },
            result: Some(result),
            executed: false,
        })
    }

    /// Plans a deletion of `arg`'s concrete value.
    pub fn delete(id: OpId, store: &TableStore<T>, arg: TableId) -> Result<Self> {
        store.get(arg)?;
        Ok(Self {
            id,
            kind: OpKind::Delete { arg },
            result: None,
            executed: false,
        })
    }

    pub fn id(&self) -> OpId {
        self.id
    }

    pub fn kind(&self) -> &OpKind<T> {
        &self.kind
    }

    /// Stable operator name for logs.
    pub fn name(&self) -> &'static str {
        match self.kind {
            OpKind::Combine { .. } => "combine",
            OpKind::Project { .. } => "project",
            OpKind::Delete { .. } => "delete",
        }
    }

    pub fn args(&self) -> Vec<TableId> {
        match &self.kind {
            OpKind::Combine { left, right, .. } => vec![*left, *right],
            OpKind::Project { arg, .. } | OpKind::Delete { arg } => vec![*arg],
        }
    }

    pub fn result(&self) -> Option<TableId> {
        self.result
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Runs the operator. A second call on an already-executed operator is
    /// a no-op.
    pub fn execute(&mut self, store: &mut TableStore<T>) -> Result<()> {
        if self.executed {
            return Ok(());
        }
        match &self.kind {
            OpKind::Combine { left, right, f } => {
                let l = concrete(store, *left)?;
                let r = concrete(store, *right)?;
                let out = f(l, r);
                let result = self.result.ok_or(ScheduleError::UnknownOperator)?;
                store.set_concrete(result, out)?;
            }
            OpKind::Project { arg, dropped, f } => {
                let a = concrete(store, *arg)?;
                let out = f(a, dropped);
                let result = self.result.ok_or(ScheduleError::UnknownOperator)?;
                store.set_concrete(result, out)?;
            }
            OpKind::Delete { arg } => {
                store.release(*arg)?;
            }
        }
        trace!(op = %self.id, kind = self.name(), "executed operator");
        self.executed = true;
        Ok(())
    }

    /// Restores the pre-execution state: the result table becomes abstract
    /// again. Irreversible operators (Delete) refuse. No-op when the
    /// operator has not executed.
    pub fn undo(&mut self, store: &mut TableStore<T>) -> Result<()> {
        if matches!(self.kind, OpKind::Delete { .. }) {
            return Err(ScheduleError::Unsupported("undo of a delete"));
        }
        if !self.executed {
            return Ok(());
        }
        if let Some(result) = self.result {
            store.release(result)?;
        }
        self.executed = false;
        Ok(())
    }

    /// Estimated multiplications/additions: the number of result cells for
    /// a combination, the number of argument cells for a projection.
    pub fn nb_operations(&self, store: &TableStore<T>) -> Result<u64> {
        match &self.kind {
            OpKind::Combine { .. } => {
                let result = self.result.ok_or(ScheduleError::UnknownOperator)?;
                Ok(store.get(result)?.cells())
            }
            OpKind::Project { arg, .. } => Ok(store.get(*arg)?.cells()),
            OpKind::Delete { .. } => Ok(1),
        }
    }

    /// Estimated memory effect, purely from label domain sizes.
    pub fn memory_usage(&self, store: &TableStore<T>) -> Result<MemoryDelta> {
        match &self.kind {
            OpKind::Combine { .. } | OpKind::Project { .. } => {
                let result = self.result.ok_or(ScheduleError::UnknownOperator)?;
                let cells = store.get(result)?.cells();
                Ok(MemoryDelta {
                    peak_cells: cells,
                    residual_cells: cells.min(i64::MAX as u64) as i64,
                })
            }
            OpKind::Delete { arg } => {
                let cells = store.get(*arg)?.cells();
                Ok(MemoryDelta {
                    peak_cells: 0,
                    residual_cells: -(cells.min(i64::MAX as u64) as i64),
                })
            }
        }
    }

    /// Strictest comparison tier: same variant over the very same input
    /// identities (and, for projections, the same dropped labels).
    pub fn same_identity(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (
                OpKind::Combine { left: l1, right: r1, .. },
                OpKind::Combine { left: l2, right: r2, .. },
            ) => l1 == l2 && r1 == r2,
            (
                OpKind::Project { arg: a1, dropped: d1, .. },
                OpKind::Project { arg: a2, dropped: d2, .. },
            ) => a1 == a2 && d1 == d2,
            (OpKind::Delete { arg: a1 }, OpKind::Delete { arg: a2 }) => a1 == a2,
            _ => false,
        }
    }

    /// Middle tier: same variant, argument tables equal by content
    /// (shape and value, not identity).
    pub fn has_same_arguments(&self, other: &Self, store: &TableStore<T>) -> Result<bool> {
        if !self.same_variant(other) {
            return Ok(false);
        }
        if !self.same_extras(other) {
            return Ok(false);
        }
        let a = self.args();
        let b = other.args();
        for (&x, &y) in a.iter().zip(b.iter()) {
            let tx = store.get(x)?;
            let ty = store.get(y)?;
            if tx.dims() != ty.dims() || tx.value() != ty.value() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Loosest tier: same variant, argument label sets equal. Enough to
    /// substitute one shape-compatible table for another in a rewritten
    /// plan.
    pub fn has_similar_arguments(&self, other: &Self, store: &TableStore<T>) -> Result<bool> {
        if !self.same_variant(other) {
            return Ok(false);
        }
        if !self.same_extras(other) {
            return Ok(false);
        }
        let a = self.args();
        let b = other.args();
        for (&x, &y) in a.iter().zip(b.iter()) {
            if store.get(x)?.label_set() != store.get(y)?.label_set() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Swaps the argument tables. The replacement count must match the
    /// operator's arity and every replacement must carry the same label
    /// sequence as the slot it fills.
    pub fn update_args(&mut self, new_args: &[TableId], store: &TableStore<T>) -> Result<()> {
        let current = self.args();
        if new_args.len() != current.len() {
            return Err(ScheduleError::Arity {
                expected: current.len(),
                got: new_args.len(),
            });
        }
        for (&old, &new) in current.iter().zip(new_args.iter()) {
            let want: Vec<&str> = store.get(old)?.dims().iter().map(|d| d.label.as_str()).collect();
            let got: Vec<String> = store.get(new)?.labels().map(str::to_owned).collect();
            if got != want {
                return Err(ScheduleError::Incompatible(format!(
                    "replacement {new} has labels {:?}, slot expects {:?}",
                    got, want
                )));
            }
        }
        match &mut self.kind {
            OpKind::Combine { left, right, .. } => {
                *left = new_args[0];
                *right = new_args[1];
            }
            OpKind::Project { arg, .. } | OpKind::Delete { arg } => {
                *arg = new_args[0];
            }
        }
        Ok(())
    }

    fn same_variant(&self, other: &Self) -> bool {
        matches!(
            (&self.kind, &other.kind),
            (OpKind::Combine { .. }, OpKind::Combine { .. })
                | (OpKind::Project { .. }, OpKind::Project { .. })
                | (OpKind::Delete { .. }, OpKind::Delete { .. })
        )
    }

    fn same_extras(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (OpKind::Project { dropped: d1, .. }, OpKind::Project { dropped: d2, .. }) => d1 == d2,
            _ => true,
        }
    }
}

impl<T: Tabular> PartialEq for ScheduleOperator<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

fn concrete<T: Tabular>(store: &TableStore<T>, id: TableId) -> Result<&T> {
    store
        .get(id)?
        .value()
        .ok_or(ScheduleError::AbstractArgument(id))
}
