//! Deferred schedules end to end: planning, costing, execution, undo,
//! duplicate detection.

mod common;

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use arbor_schedule::{Dim, DuplicateKind, MemoryDelta, Schedule, ScheduleError};

use common::DenseTable;

fn dims(spec: &[(&str, u64)]) -> Vec<Dim> {
    spec.iter().map(|&(l, s)| Dim::new(l, s)).collect()
}

fn drop_set(labels: &[&str]) -> BTreeSet<String> {
    labels.iter().map(|l| l.to_string()).collect()
}

/// A(x,y) and B(y,z) with known values; the plan computes sum_y A*B.
fn marginal_plan() -> (Schedule<DenseTable>, arbor_core::TableId) {
    let mut s = Schedule::new();
    let a = s.new_table(dims(&[("x", 2), ("y", 2)]), true);
    let b = s.new_table(dims(&[("y", 2), ("z", 2)]), true);
    s.supply(
        a,
        DenseTable::with_values(&[("x", 2), ("y", 2)], vec![1.0, 2.0, 3.0, 4.0]),
    )
    .unwrap();
    s.supply(
        b,
        DenseTable::with_values(&[("y", 2), ("z", 2)], vec![5.0, 6.0, 7.0, 8.0]),
    )
    .unwrap();

    let c = s.combine(a, b, common::combine).unwrap();
    let r1 = s.result_of(c).unwrap().unwrap();
    let p = s.project(r1, drop_set(&["y"]), common::project).unwrap();
    let r2 = s.result_of(p).unwrap().unwrap();
    (s, r2)
}

#[test]
fn combine_executes_pointwise_product() {
    let mut s = Schedule::new();
    let a = s.new_table(dims(&[("x", 2), ("y", 2)]), true);
    let b = s.new_table(dims(&[("y", 2), ("z", 2)]), true);
    s.supply(
        a,
        DenseTable::with_values(&[("x", 2), ("y", 2)], vec![1.0, 2.0, 3.0, 4.0]),
    )
    .unwrap();
    s.supply(
        b,
        DenseTable::with_values(&[("y", 2), ("z", 2)], vec![5.0, 6.0, 7.0, 8.0]),
    )
    .unwrap();

    let c = s.combine(a, b, common::combine).unwrap();
    let r1 = s.result_of(c).unwrap().unwrap();
    // Shape is fixed at planning time, before execution.
    assert!(s.table(r1).unwrap().is_abstract());
    assert_eq!(
        s.table(r1).unwrap().labels().collect::<Vec<_>>(),
        vec!["x", "y", "z"]
    );

    s.execute_op(c).unwrap();
    let expected = DenseTable::with_values(
        &[("x", 2), ("y", 2), ("z", 2)],
        vec![5.0, 6.0, 14.0, 16.0, 15.0, 18.0, 28.0, 32.0],
    );
    assert_eq!(s.table(r1).unwrap().value(), Some(&expected));
}

#[test]
fn full_plan_computes_the_marginal() {
    let (mut s, r2) = marginal_plan();
    s.execute_all().unwrap();

    let expected =
        DenseTable::with_values(&[("x", 2), ("z", 2)], vec![19.0, 22.0, 43.0, 50.0]);
    assert_eq!(s.table(r2).unwrap().value(), Some(&expected));

    // Persistent inputs survive; the intermediate combine result was
    // released after its only consumer ran.
    for op in s.operators() {
        assert!(op.is_executed());
    }
    let intermediate = s
        .operators()
        .find(|op| op.name() == "combine")
        .and_then(|op| op.result())
        .unwrap();
    assert!(s.table(intermediate).unwrap().is_abstract());

    // Running the plan again is a no-op.
    s.execute_all().unwrap();
    assert_eq!(
        s.table(r2).unwrap().value(),
        Some(&DenseTable::with_values(
            &[("x", 2), ("z", 2)],
            vec![19.0, 22.0, 43.0, 50.0]
        ))
    );
}

#[test]
fn supply_validates_labels_and_domains() {
    let mut s: Schedule<DenseTable> = Schedule::new();
    let a = s.new_table(dims(&[("x", 2), ("y", 2)]), false);

    let swapped = DenseTable::filled(&[("y", 2), ("x", 2)], 1.0);
    assert!(matches!(
        s.supply(a, swapped),
        Err(ScheduleError::Incompatible(_))
    ));

    let resized = DenseTable::filled(&[("x", 3), ("y", 2)], 1.0);
    assert!(matches!(
        s.supply(a, resized),
        Err(ScheduleError::Incompatible(_))
    ));

    assert!(s.table(a).unwrap().is_abstract());
}

#[test]
fn execution_requires_concrete_inputs() {
    let mut s: Schedule<DenseTable> = Schedule::new();
    let a = s.new_table(dims(&[("x", 2)]), false);
    let b = s.new_table(dims(&[("x", 2)]), false);
    let c = s.combine(a, b, common::combine).unwrap();

    assert_eq!(s.execute_op(c), Err(ScheduleError::AbstractArgument(a)));
}

#[test]
fn undo_then_reexecute_is_identical() {
    let (mut s, _) = marginal_plan();
    let c = s.operators().next().unwrap().id();
    let r1 = s.result_of(c).unwrap().unwrap();

    // Undoing a never-executed operator is a no-op.
    s.undo_op(c).unwrap();
    assert!(!s.operator(c).unwrap().is_executed());

    s.execute_op(c).unwrap();
    let first = s.table(r1).unwrap().value().cloned().unwrap();

    s.undo_op(c).unwrap();
    assert!(s.table(r1).unwrap().is_abstract());
    assert!(!s.operator(c).unwrap().is_executed());

    s.execute_op(c).unwrap();
    assert_eq!(s.table(r1).unwrap().value(), Some(&first));
}

#[test]
fn delete_runs_after_its_consumers_and_cannot_be_undone() {
    let mut s = Schedule::new();
    let a = s.new_table(dims(&[("x", 2)]), false);
    let b = s.new_table(dims(&[("x", 2)]), false);
    s.supply(a, DenseTable::with_values(&[("x", 2)], vec![1.0, 2.0]))
        .unwrap();
    s.supply(b, DenseTable::with_values(&[("x", 2)], vec![3.0, 4.0]))
        .unwrap();

    // Planned before the combine that still needs `a`.
    let d = s.delete(a).unwrap();
    let c = s.combine(a, b, common::combine).unwrap();

    assert_eq!(s.execution_order().unwrap(), vec![c, d]);

    s.execute_all().unwrap();
    assert!(s.table(a).unwrap().is_abstract());
    let r = s.result_of(c).unwrap().unwrap();
    assert_eq!(
        s.table(r).unwrap().value(),
        Some(&DenseTable::with_values(&[("x", 2)], vec![3.0, 8.0]))
    );

    assert_eq!(
        s.undo_op(d),
        Err(ScheduleError::Unsupported("undo of a delete"))
    );
}

#[test]
fn project_ignores_absent_dropped_labels() {
    let mut s = Schedule::new();
    let a = s.new_table(dims(&[("x", 2)]), true);
    let value = DenseTable::with_values(&[("x", 2)], vec![1.0, 2.0]);
    s.supply(a, value.clone()).unwrap();

    let p = s.project(a, drop_set(&["nope"]), common::project).unwrap();
    let r = s.result_of(p).unwrap().unwrap();
    assert_eq!(s.table(r).unwrap().labels().collect::<Vec<_>>(), vec!["x"]);

    s.execute_op(p).unwrap();
    assert_eq!(s.table(r).unwrap().value(), Some(&value));
}

#[test]
fn update_args_validates_arity_and_shape() {
    let mut s: Schedule<DenseTable> = Schedule::new();
    let a = s.new_table(dims(&[("x", 2)]), false);
    let a2 = s.new_table(dims(&[("x", 2)]), false);
    let b = s.new_table(dims(&[("y", 2)]), false);
    let c = s.combine(a, b, common::combine).unwrap();

    assert_eq!(
        s.update_op_args(c, &[a2]),
        Err(ScheduleError::Arity {
            expected: 2,
            got: 1
        })
    );
    // `b` does not carry the label sequence of slot 0.
    assert!(matches!(
        s.update_op_args(c, &[b, b]),
        Err(ScheduleError::Incompatible(_))
    ));

    s.update_op_args(c, &[a2, b]).unwrap();
    assert_eq!(s.operator(c).unwrap().args(), vec![a2, b]);
}

#[test]
fn rewired_cycles_are_detected() {
    let mut s: Schedule<DenseTable> = Schedule::new();
    let a = s.new_table(dims(&[("x", 2)]), false);
    let p1 = s.project(a, drop_set(&[]), common::project).unwrap();
    let r1 = s.result_of(p1).unwrap().unwrap();
    let p2 = s.project(r1, drop_set(&[]), common::project).unwrap();
    let r2 = s.result_of(p2).unwrap().unwrap();

    // Feed the second projection's result back into the first.
    s.update_op_args(p1, &[r2]).unwrap();
    assert_eq!(s.execution_order(), Err(ScheduleError::CyclicPlan));
}

#[test]
fn duplicate_detection_reports_the_strongest_tier() {
    let mut s = Schedule::new();
    let mk = |s: &mut Schedule<DenseTable>, data: Vec<f64>| {
        let t = s.new_table(dims(&[("x", 2)]), true);
        s.supply(t, DenseTable::with_values(&[("x", 2)], data))
            .unwrap();
        t
    };
    let t1 = mk(&mut s, vec![1.0, 2.0]);
    let t2 = mk(&mut s, vec![3.0, 4.0]);
    let t3 = mk(&mut s, vec![1.0, 2.0]);
    let t4 = mk(&mut s, vec![3.0, 4.0]);
    let t5 = mk(&mut s, vec![9.0, 9.0]);

    let a = s.combine(t1, t2, common::combine).unwrap();
    let b = s.combine(t1, t2, common::combine).unwrap();
    let c = s.combine(t3, t4, common::combine).unwrap();
    let d = s.combine(t5, t2, common::combine).unwrap();

    let found: BTreeMap<_, _> = s
        .find_duplicates()
        .unwrap()
        .into_iter()
        .map(|(x, y, kind)| ((x, y), kind))
        .collect();

    assert_eq!(found.len(), 6);
    assert_eq!(found[&(a, b)], DuplicateKind::Identical);
    assert_eq!(found[&(a, c)], DuplicateKind::SameArguments);
    assert_eq!(found[&(b, c)], DuplicateKind::SameArguments);
    assert_eq!(found[&(a, d)], DuplicateKind::SimilarArguments);
    assert_eq!(found[&(c, d)], DuplicateKind::SimilarArguments);
}

#[test]
fn cost_estimates_track_shapes_not_values() {
    let mut s = Schedule::new();
    let a = s.new_table(dims(&[("x", 2), ("y", 3)]), false);
    let b = s.new_table(dims(&[("y", 3), ("z", 4)]), false);
    s.supply(a, DenseTable::filled(&[("x", 2), ("y", 3)], 1.0))
        .unwrap();
    s.supply(b, DenseTable::filled(&[("y", 3), ("z", 4)], 1.0))
        .unwrap();

    let c = s.combine(a, b, common::combine).unwrap();
    let r1 = s.result_of(c).unwrap().unwrap();
    s.project(r1, drop_set(&["y"]), common::project).unwrap();
    s.delete(a).unwrap();

    // Combine costs its 2*3*4-cell result, project its 24-cell argument,
    // delete a constant.
    assert_eq!(s.nb_operations().unwrap(), 24 + 24 + 1);

    // Simulated peak: both inputs (18 cells) plus the combine result;
    // at the end only the 8-cell projection result is live.
    assert_eq!(
        s.memory_usage().unwrap(),
        MemoryDelta {
            peak_cells: 42,
            residual_cells: 8,
        }
    );
}
