//! Shared test fixtures: a small dense table type implementing the
//! `Tabular` seam, with real combine/project arithmetic so executed plans
//! can be checked cell by cell.

use std::collections::BTreeSet;

use arbor_schedule::Tabular;

#[derive(Debug, Clone, PartialEq)]
pub struct DenseTable {
    /// (label, domain size) in dimension order; last dimension varies
    /// fastest in `data`.
    pub dims: Vec<(String, u64)>,
    pub data: Vec<f64>,
}

impl DenseTable {
    pub fn filled(dims: &[(&str, u64)], fill: f64) -> Self {
        let dims: Vec<(String, u64)> = dims.iter().map(|&(l, s)| (l.to_string(), s)).collect();
        let total: u64 = dims.iter().map(|&(_, s)| s).product();
        Self {
            dims,
            data: vec![fill; total as usize],
        }
    }

    pub fn with_values(dims: &[(&str, u64)], data: Vec<f64>) -> Self {
        let table = Self::filled(dims, 0.0);
        assert_eq!(table.data.len(), data.len());
        Self {
            dims: table.dims,
            data,
        }
    }

    fn index_of(&self, assignment: &[(String, u64)]) -> usize {
        let mut idx = 0u64;
        for (label, size) in &self.dims {
            let value = assignment
                .iter()
                .find(|(l, _)| l == label)
                .map(|&(_, v)| v)
                .unwrap_or(0);
            idx = idx * size + value;
        }
        idx as usize
    }
}

fn assignment_at(dims: &[(String, u64)], mut idx: u64) -> Vec<(String, u64)> {
    let mut out = vec![(String::new(), 0u64); dims.len()];
    for (slot, (label, size)) in dims.iter().enumerate().rev() {
        out[slot] = (label.clone(), idx % size);
        idx /= size;
    }
    out
}

impl Tabular for DenseTable {
    fn labels(&self) -> Vec<String> {
        self.dims.iter().map(|(l, _)| l.clone()).collect()
    }

    fn domain_size(&self, label: &str) -> u64 {
        self.dims
            .iter()
            .find(|(l, _)| l == label)
            .map(|&(_, s)| s)
            .unwrap_or(1)
    }
}

/// Pointwise product over the union of both label sequences.
pub fn combine(a: &DenseTable, b: &DenseTable) -> DenseTable {
    let mut dims = a.dims.clone();
    for d in &b.dims {
        if !dims.iter().any(|(l, _)| l == &d.0) {
            dims.push(d.clone());
        }
    }
    let total: u64 = dims.iter().map(|&(_, s)| s).product();
    let mut data = Vec::with_capacity(total as usize);
    for idx in 0..total {
        let asg = assignment_at(&dims, idx);
        data.push(a.data[a.index_of(&asg)] * b.data[b.index_of(&asg)]);
    }
    DenseTable { dims, data }
}

/// Sum-marginalization of the dropped labels.
pub fn project(a: &DenseTable, dropped: &BTreeSet<String>) -> DenseTable {
    let dims: Vec<(String, u64)> = a
        .dims
        .iter()
        .filter(|(l, _)| !dropped.contains(l))
        .cloned()
        .collect();
    let total: u64 = dims.iter().map(|&(_, s)| s).product();
    let mut data = vec![0.0; total as usize];
    let in_total: u64 = a.dims.iter().map(|&(_, s)| s).product();
    for idx in 0..in_total {
        let asg = assignment_at(&a.dims, idx);
        data[linear_index(&dims, &asg)] += a.data[idx as usize];
    }
    DenseTable { dims, data }
}

fn linear_index(dims: &[(String, u64)], assignment: &[(String, u64)]) -> usize {
    let mut idx = 0u64;
    for (label, size) in dims {
        let value = assignment
            .iter()
            .find(|(l, _)| l == label)
            .map(|&(_, v)| v)
            .unwrap_or(0);
        idx = idx * size + value;
    }
    idx as usize
}
