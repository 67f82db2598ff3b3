//! Quick diagonal search.
//!
//! Looks at the diagonal only and accepts a diagonal with a single,
//! symmetrically placed neighbour in both its row and its column on sight.
//! This is the typical pattern of a conductance between two nodes.
//!
//! Otherwise every diagonal up to the search limit is visited, so the
//! lowest product is always found. Diagonals tied at that product are
//! compared numerically at the end.

use spicier_sparse::{ElementId, Scalar, SparseMatrix};

use super::{Pivot, PivotQuality, largest_other_in_column};
use crate::markowitz::Markowitz;

/// Upper bound on the number of tied diagonals compared numerically.
const MAX_MARKOWITZ_TIES: usize = 100;

pub(super) fn find<T: Scalar>(
    markowitz: &Markowitz<T>,
    matrix: &SparseMatrix<T>,
    step: usize,
) -> Option<Pivot> {
    let config = markowitz.config();
    let mut min_product = i32::MAX;
    let mut tied: Vec<ElementId> = Vec::new();

    for i in step..=markowitz.limit() {
        let product = markowitz.product(i);
        if product > min_product {
            continue;
        }
        let Some(diagonal) = matrix.find_diagonal_element(i) else {
            continue;
        };
        let magnitude = markowitz.magnitude(&matrix[diagonal].value());
        if magnitude <= config.absolute_pivot_threshold {
            continue;
        }

        if product == 1 {
            if let (Some(in_row), Some(in_column)) = (
                other_in_row(matrix, diagonal, step),
                other_in_column(matrix, diagonal, step),
            ) {
                if matrix[in_row].column() == matrix[in_column].row() {
                    let largest = markowitz
                        .magnitude(&matrix[in_row].value())
                        .max(markowitz.magnitude(&matrix[in_column].value()));
                    if magnitude >= largest {
                        return Some(Pivot::new(diagonal, PivotQuality::Good));
                    }
                }
            }
        }

        if product < min_product {
            tied.clear();
            tied.push(diagonal);
            min_product = product;
        } else if tied.len() < MAX_MARKOWITZ_TIES {
            tied.push(diagonal);
        }
    }

    // Numerically pick the best of the tied diagonals
    let mut chosen = None;
    let mut best_ratio = 1.0 / config.relative_pivot_threshold;
    for diagonal in tied {
        let magnitude = markowitz.magnitude(&matrix[diagonal].value());
        let ratio = largest_other_in_column(markowitz, matrix, diagonal, step) / magnitude;
        if ratio < best_ratio {
            best_ratio = ratio;
            chosen = Some(diagonal);
        }
    }
    chosen.map(|id| Pivot::new(id, PivotQuality::Suboptimal))
}

/// The other active element in the diagonal's row, if any.
fn other_in_row<T: Scalar>(
    matrix: &SparseMatrix<T>,
    diagonal: ElementId,
    step: usize,
) -> Option<ElementId> {
    matrix[diagonal].right().or_else(|| {
        matrix[diagonal]
            .left()
            .filter(|&id| matrix[id].column() >= step)
    })
}

/// The other active element in the diagonal's column, if any.
fn other_in_column<T: Scalar>(
    matrix: &SparseMatrix<T>,
    diagonal: ElementId,
    step: usize,
) -> Option<ElementId> {
    matrix[diagonal].below().or_else(|| {
        matrix[diagonal]
            .above()
            .filter(|&id| matrix[id].row() >= step)
    })
}
