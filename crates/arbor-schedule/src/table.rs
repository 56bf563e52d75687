//! Schedule tables: stable identity, fixed dimension-label sequence, and an
//! Abstract/Concrete state.
//!
//! A table's label sequence is fixed at creation, even while the table is
//! still abstract; that is what lets operators downstream be planned and
//! costed before anything is materialized. The `persistent` flag decides
//! whether the concrete value survives past the last operator consuming it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use arbor_core::TableId;

use crate::error::{Result, ScheduleError};

/// The only window the scheduling layer has into a concrete table type:
/// its dimension labels and their domain sizes.
pub trait Tabular: Clone + PartialEq {
    fn labels(&self) -> Vec<String>;
    fn domain_size(&self, label: &str) -> u64;
}

/// One named dimension with its domain cardinality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dim {
    pub label: String,
    pub size: u64,
}

impl Dim {
    pub fn new(label: impl Into<String>, size: u64) -> Self {
        Self {
            label: label.into(),
            size: size.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableState<T> {
    Abstract,
    Concrete(T),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleTable<T> {
    id: TableId,
    dims: Vec<Dim>,
    state: TableState<T>,
    persistent: bool,
}

impl<T: Tabular> ScheduleTable<T> {
    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.dims.iter().map(|d| d.label.as_str())
    }

    pub fn label_set(&self) -> BTreeSet<String> {
        self.dims.iter().map(|d| d.label.clone()).collect()
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.state, TableState::Abstract)
    }

    pub fn value(&self) -> Option<&T> {
        match &self.state {
            TableState::Abstract => None,
            TableState::Concrete(v) => Some(v),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn set_persistent(&mut self, persistent: bool) {
        self.persistent = persistent;
    }

    /// Number of cells a concrete value of this shape holds.
    pub fn cells(&self) -> u64 {
        self.dims
            .iter()
            .fold(1u64, |acc, d| acc.saturating_mul(d.size))
    }
}

/// Owner of every table in one plan. Operators reference tables by id
/// through this store; values are never shared by pointer.
#[derive(Debug, Clone, Default)]
pub struct TableStore<T> {
    tables: BTreeMap<TableId, ScheduleTable<T>>,
    next: u64,
}

impl<T: Tabular> TableStore<T> {
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
            next: 0,
        }
    }

    pub fn create(&mut self, dims: Vec<Dim>, persistent: bool) -> TableId {
        let id = TableId::new(self.next);
        self.next += 1;
        self.tables.insert(
            id,
            ScheduleTable {
                id,
                dims,
                state: TableState::Abstract,
                persistent,
            },
        );
        id
    }

    pub fn get(&self, id: TableId) -> Result<&ScheduleTable<T>> {
        self.tables.get(&id).ok_or(ScheduleError::UnknownTable(id))
    }

    /// Makes a table concrete. The value's label sequence and domain sizes
    /// must match the shape fixed at creation.
    pub fn supply(&mut self, id: TableId, value: T) -> Result<()> {
        let table = self
            .tables
            .get_mut(&id)
            .ok_or(ScheduleError::UnknownTable(id))?;
        let got = value.labels();
        let want: Vec<&str> = table.dims.iter().map(|d| d.label.as_str()).collect();
        if got != want {
            return Err(ScheduleError::Incompatible(format!(
                "value labels {:?} do not match table shape {:?}",
                got, want
            )));
        }
        for d in &table.dims {
            if value.domain_size(&d.label) != d.size {
                return Err(ScheduleError::Incompatible(format!(
                    "domain of '{}' is {}, table expects {}",
                    d.label,
                    value.domain_size(&d.label),
                    d.size
                )));
            }
        }
        table.state = TableState::Concrete(value);
        Ok(())
    }

    /// Releases a table's concrete value, returning it to Abstract.
    /// No-op if the table is already abstract.
    pub fn release(&mut self, id: TableId) -> Result<()> {
        let table = self
            .tables
            .get_mut(&id)
            .ok_or(ScheduleError::UnknownTable(id))?;
        table.state = TableState::Abstract;
        Ok(())
    }

    pub fn ids(&self) -> impl Iterator<Item = TableId> + '_ {
        self.tables.keys().copied()
    }

    pub(crate) fn set_concrete(&mut self, id: TableId, value: T) -> Result<()> {
        let table = self
            .tables
            .get_mut(&id)
            .ok_or(ScheduleError::UnknownTable(id))?;
        table.state = TableState::Concrete(value);
        Ok(())
    }
}
