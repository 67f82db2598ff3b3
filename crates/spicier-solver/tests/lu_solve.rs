//! End-to-end ordering, factoring and solving against dense references.

mod common;

use common::{
    dense, dense_solve, random_system, random_tridiagonal, relative_error, rhs_of, stamp, tridiagonal,
};
use nalgebra::DVector;
use num_complex::Complex64 as C64;
use rayon::prelude::*;
use spicier_solver::{Error, PivotConfig, SparseLuSolver};

fn solve(size: usize, entries: &[(usize, usize, f64)], rhs: &[f64]) -> (SparseLuSolver<f64>, Vec<f64>) {
    let mut solver = SparseLuSolver::new();
    stamp(&mut solver, entries);
    solver.set_rhs(rhs);
    solver.order_and_factor().unwrap();
    let mut x = vec![0.0; size];
    solver.solve(&mut x).unwrap();
    (solver, x)
}

#[test]
fn tridiagonal_matches_dense_solution() {
    let size = 50;
    for seed in 0..5 {
        let entries = random_tridiagonal(size, seed);
        let rhs = rhs_of(size, seed + 3);
        let (solver, x) = solve(size, &entries, &rhs);

        let want = dense_solve(size, &entries, &rhs);
        let error = relative_error(&x, &want);
        assert!(error < 1e-9, "seed {seed}: relative error {error}");
        // Eliminating from the ends inward creates no fill-in
        assert_eq!(solver.fillins(), 0, "seed {seed}");
    }
}

#[test]
fn constant_tridiagonal_creates_no_fillin() {
    let size = 50;
    let (solver, _) = solve(size, &tridiagonal(size), &rhs_of(size, 3));
    assert_eq!(solver.fillins(), 0);
}

#[test]
fn reduced_pivot_search_matches_dense_solution() {
    let size = 40;
    let reduction = 5;
    let entries = random_system(size, 3, 0, 31);
    let rhs = rhs_of(size, 32);
    let mut solver = SparseLuSolver::new();
    stamp(&mut solver, &entries);
    solver.set_rhs(&rhs);
    solver.set_pivot_search_reduction(reduction);
    assert_eq!(solver.order_and_factor().unwrap(), size);

    // The reserved equations keep their place
    for i in size - reduction + 1..=size {
        assert_eq!(solver.row_translation().to_internal(i), i);
        assert_eq!(solver.column_translation().to_internal(i), i);
    }
    let mut x = vec![0.0; size];
    solver.solve(&mut x).unwrap();
    let want = dense_solve(size, &entries, &rhs);
    let error = relative_error(&x, &want);
    assert!(error < 1e-9, "relative error {error}");

    // Same values again: the ordering is reused, tail included
    let fillins = solver.fillins();
    solver.reset();
    stamp(&mut solver, &entries);
    solver.set_rhs(&rhs);
    solver.order_and_factor().unwrap();
    assert_eq!(solver.fillins(), fillins);
}

#[test]
fn random_systems_match_dense_solution() {
    for seed in 0..10 {
        let size = 40;
        let entries = random_system(size, 3, 6, seed);
        let rhs = rhs_of(size, seed + 100);
        let (_, x) = solve(size, &entries, &rhs);
        let want = dense_solve(size, &entries, &rhs);
        let error = relative_error(&x, &want);
        assert!(error < 1e-9, "seed {seed}: relative error {error}");
    }
}

#[test]
fn transposed_solve_matches_dense_transpose() {
    let size = 30;
    let entries = random_system(size, 3, 4, 11);
    let rhs = rhs_of(size, 12);
    let mut solver = SparseLuSolver::new();
    stamp(&mut solver, &entries);
    solver.set_rhs(&rhs);
    solver.order_and_factor().unwrap();

    let mut x = vec![0.0; size];
    solver.solve_transposed(&mut x).unwrap();

    let transposed = dense(size, &entries).transpose();
    let want = transposed
        .lu()
        .solve(&DVector::from_column_slice(&rhs))
        .unwrap();
    let error = relative_error(&x, want.as_slice());
    assert!(error < 1e-9, "relative error {error}");
}

#[test]
fn complex_system_has_small_residual() {
    // Complex tridiagonal: an RC ladder at some frequency
    let size = 30;
    let mut entries = Vec::new();
    for i in 1..=size {
        entries.push((i, i, C64::new(2.0, 0.5)));
        if i > 1 {
            entries.push((i, i - 1, C64::new(-1.0, 0.0)));
        }
        if i < size {
            entries.push((i, i + 1, C64::new(-1.0, 0.0)));
        }
    }
    let rhs: Vec<C64> = (0..size).map(|i| C64::new(1.0, i as f64 * 0.1)).collect();

    let mut solver = SparseLuSolver::new();
    stamp(&mut solver, &entries);
    solver.set_rhs(&rhs);
    solver.order_and_factor().unwrap();
    let mut x = vec![C64::new(0.0, 0.0); size];
    solver.solve(&mut x).unwrap();

    let mut residual = rhs.clone();
    for &(r, c, v) in &entries {
        residual[r - 1] -= v * x[c - 1];
    }
    let worst = residual.iter().fold(0.0f64, |m, r| m.max(r.norm()));
    assert!(worst < 1e-10, "residual {worst}");
}

#[test]
fn refactoring_reuses_the_ordering() {
    let size = 20;
    let entries = random_system(size, 2, 5, 21);
    let rhs = rhs_of(size, 22);
    let mut solver = SparseLuSolver::new();
    stamp(&mut solver, &entries);
    solver.set_rhs(&rhs);
    solver.order_and_factor().unwrap();
    let elements = solver.matrix().element_count();

    // Same pattern, scaled values
    let scaled: Vec<_> = entries.iter().map(|&(r, c, v)| (r, c, 3.0 * v)).collect();
    solver.reset();
    stamp(&mut solver, &scaled);
    solver.set_rhs(&rhs);
    solver.factor().unwrap();

    let mut x = vec![0.0; size];
    solver.solve(&mut x).unwrap();
    let want = dense_solve(size, &scaled, &rhs);
    let error = relative_error(&x, &want);
    assert!(error < 1e-9, "relative error {error}");
    assert_eq!(solver.matrix().element_count(), elements);
    assert!(!solver.needs_reordering());
}

/// Replace the value stamped at external (`row`, `column`).
fn with_value(
    entries: &[(usize, usize, f64)],
    at: (usize, usize),
    value: f64,
) -> Vec<(usize, usize, f64)> {
    entries
        .iter()
        .map(|&(r, c, v)| if (r, c) == at { (r, c, value) } else { (r, c, v) })
        .collect()
}

#[test]
fn bad_diagonal_triggers_partial_reordering() {
    let size = 4;
    let entries = tridiagonal(size);
    let rhs = rhs_of(size, 5);
    let mut solver = SparseLuSolver::new();
    stamp(&mut solver, &entries);
    solver.set_rhs(&rhs);
    solver.order_and_factor().unwrap();

    // Weaken the first and the last pivot of the current ordering
    let first = (
        solver.row_translation().to_external(1),
        solver.column_translation().to_external(1),
    );
    let last = (
        solver.row_translation().to_external(size),
        solver.column_translation().to_external(size),
    );
    let weak = with_value(&with_value(&entries, first, 1e-6), last, 1e-9);

    solver.reset();
    stamp(&mut solver, &weak);
    solver.set_rhs(&rhs);
    assert_eq!(solver.order_and_factor().unwrap(), size);
    assert!(!solver.needs_reordering());

    let mut x = vec![0.0; size];
    solver.solve(&mut x).unwrap();
    let want = dense_solve(size, &weak, &rhs);
    let error = relative_error(&x, &want);
    assert!(error < 1e-9, "relative error {error}");
}

#[test]
fn valid_ordering_is_reused_without_search() {
    let size = 10;
    let entries = tridiagonal(size);
    let rhs = rhs_of(size, 8);
    let mut solver = SparseLuSolver::new();
    stamp(&mut solver, &entries);
    solver.set_rhs(&rhs);
    solver.order_and_factor().unwrap();
    let fillins = solver.fillins();

    solver.reset();
    stamp(&mut solver, &entries);
    solver.set_rhs(&rhs);
    solver.order_and_factor().unwrap();
    assert_eq!(solver.fillins(), fillins);

    let mut x = vec![0.0; size];
    solver.solve(&mut x).unwrap();
    let want = dense_solve(size, &entries, &rhs);
    assert!(relative_error(&x, &want) < 1e-9);
}

#[test]
fn factor_reports_zero_pivot() {
    let mut solver = SparseLuSolver::new();
    stamp(&mut solver, &[(1, 1, 1.0), (2, 2, 1.0)]);
    solver.order_and_factor().unwrap();

    solver.reset();
    stamp(&mut solver, &[(1, 1, 1.0), (2, 2, 0.0)]);
    let pivot_row = solver.row_translation().to_internal(2);
    match solver.factor() {
        Err(Error::Singular { step }) => assert_eq!(step, pivot_row),
        other => panic!("expected a singular matrix, got {other:?}"),
    }
}

#[test]
fn strict_thresholds_still_solve() {
    let config = PivotConfig {
        relative_pivot_threshold: 0.5,
        absolute_pivot_threshold: 1e-12,
        ..PivotConfig::default()
    };
    let size = 25;
    let entries = random_system(size, 3, 3, 77);
    let rhs = rhs_of(size, 78);
    let mut solver = SparseLuSolver::with_config(config).unwrap();
    stamp(&mut solver, &entries);
    solver.set_rhs(&rhs);
    solver.order_and_factor().unwrap();
    let mut x = vec![0.0; size];
    solver.solve(&mut x).unwrap();
    let want = dense_solve(size, &entries, &rhs);
    assert!(relative_error(&x, &want) < 1e-9);
}

#[test]
fn invalid_config_is_rejected() {
    let config = PivotConfig {
        relative_pivot_threshold: 2.0,
        ..PivotConfig::default()
    };
    assert!(matches!(
        SparseLuSolver::<f64>::with_config(config),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn independent_partitions_factor_in_parallel() {
    let size = 30;
    let results: Vec<f64> = (0..8u64)
        .into_par_iter()
        .map(|seed| {
            let entries = random_system(size, 3, 5, seed);
            let rhs = rhs_of(size, seed);
            let (_, x) = solve(size, &entries, &rhs);
            relative_error(&x, &dense_solve(size, &entries, &rhs))
        })
        .collect();
    for (seed, error) in results.iter().enumerate() {
        assert!(*error < 1e-9, "partition {seed}: relative error {error}");
    }
}
