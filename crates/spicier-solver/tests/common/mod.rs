//! Shared helpers for the solver integration tests.
#![allow(dead_code)]

use nalgebra::{DMatrix, DVector};
use spicier_solver::SparseLuSolver;
use spicier_sparse::Scalar;

/// SplitMix64 mixing function, used as a stateless hash RNG.
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

/// Uniform value in [0, 1) for the coordinates (`seed`, `i`, `j`).
pub fn uniform(seed: u64, i: usize, j: usize) -> f64 {
    let hash = splitmix64(
        seed ^ (i as u64).wrapping_mul(0x517cc1b727220a95) ^ (j as u64).wrapping_mul(0x5851f42d4c957f2d),
    );
    (hash >> 11) as f64 / (1u64 << 53) as f64
}

/// Tridiagonal system `-1, 4, -1` of the given size.
pub fn tridiagonal(size: usize) -> Vec<(usize, usize, f64)> {
    let mut entries = Vec::new();
    for i in 1..=size {
        entries.push((i, i, 4.0));
        if i > 1 {
            entries.push((i, i - 1, -1.0));
        }
        if i < size {
            entries.push((i, i + 1, -1.0));
        }
    }
    entries
}

/// Tridiagonal system with random values: a diagonal in [2.5, 3.5) and
/// off-diagonals of either sign with magnitude in [0.1, 1).
pub fn random_tridiagonal(size: usize, seed: u64) -> Vec<(usize, usize, f64)> {
    let off_diagonal = |i: usize, j: usize| {
        let magnitude = 0.1 + 0.9 * uniform(seed, i, j);
        if uniform(seed, j, i) < 0.5 { -magnitude } else { magnitude }
    };
    let mut entries = Vec::new();
    for i in 1..=size {
        entries.push((i, i, 2.5 + uniform(seed, i, i)));
        if i > 1 {
            entries.push((i, i - 1, off_diagonal(i, i - 1)));
        }
        if i < size {
            entries.push((i, i + 1, off_diagonal(i, i + 1)));
        }
    }
    entries
}

/// Random sparse system with about `per_row` off-diagonal entries per row.
///
/// Every `zero_every`-th diagonal is left out, which forces off-diagonal
/// pivots. The diagonal otherwise dominates so the system stays regular.
pub fn random_system(size: usize, per_row: usize, zero_every: usize, seed: u64) -> Vec<(usize, usize, f64)> {
    let mut entries = Vec::new();
    for i in 1..=size {
        for k in 0..per_row {
            let j = 1 + (uniform(seed, i, k) * size as f64) as usize % size;
            if j != i {
                entries.push((i, j, uniform(seed, i, k + 100) * 2.0 - 1.0));
            }
        }
        if zero_every == 0 || i % zero_every != 0 {
            entries.push((i, i, per_row as f64 + 1.0 + uniform(seed, i, 999)));
        } else {
            // Keep the row and its column coupled to a neighbour
            let j = if i == size { 1 } else { i + 1 };
            entries.push((i, j, 2.0 + uniform(seed, i, 500)));
            entries.push((j, i, 2.0 + uniform(seed, i, 501)));
        }
    }
    entries
}

pub fn stamp<T: Scalar>(solver: &mut SparseLuSolver<T>, entries: &[(usize, usize, T)]) {
    for &(row, column, value) in entries {
        let id = solver.get_element(row, column);
        solver.add_value(id, value);
    }
}

pub fn dense(size: usize, entries: &[(usize, usize, f64)]) -> DMatrix<f64> {
    let mut matrix = DMatrix::zeros(size, size);
    for &(row, column, value) in entries {
        matrix[(row - 1, column - 1)] += value;
    }
    matrix
}

/// Reference solution through nalgebra's dense LU.
pub fn dense_solve(size: usize, entries: &[(usize, usize, f64)], rhs: &[f64]) -> Vec<f64> {
    let matrix = dense(size, entries);
    let b = DVector::from_column_slice(rhs);
    let x = matrix.lu().solve(&b).expect("reference system is singular");
    x.iter().copied().collect()
}

/// Largest relative difference between two vectors.
pub fn relative_error(got: &[f64], want: &[f64]) -> f64 {
    let scale = want.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1e-300);
    got.iter()
        .zip(want)
        .fold(0.0f64, |m, (a, b)| m.max((a - b).abs()))
        / scale
}

pub fn rhs_of(size: usize, seed: u64) -> Vec<f64> {
    (0..size).map(|i| 1.0 + uniform(seed, i, 7)).collect()
}
