//! Singleton search.
//!
//! A zero Markowitz product means the row or the column at that index has a
//! single active element. Eliminating it creates no fill-in at all.
//! That element is only taken when it lies inside the search limit.

use spicier_sparse::{ElementId, Scalar, SparseMatrix};

use super::{Pivot, PivotQuality};
use crate::markowitz::Markowitz;

pub(super) fn find<T: Scalar>(
    markowitz: &Markowitz<T>,
    matrix: &SparseMatrix<T>,
    step: usize,
) -> Option<Pivot> {
    let mut remaining = markowitz.singletons();
    if remaining == 0 {
        return None;
    }
    let threshold = markowitz.config().absolute_pivot_threshold;
    let max = markowitz.limit();
    let acceptable = |id: ElementId| {
        let element = &matrix[id];
        element.row() <= max
            && element.column() <= max
            && markowitz.magnitude(&element.value()) > threshold
    };

    for index in step..=max {
        if markowitz.product(index) != 0 {
            continue;
        }

        // Column singletons first
        if markowitz.column_count(index) == 0 {
            if let Some(id) = only_in_column(matrix, index, step).filter(|&id| acceptable(id)) {
                return Some(Pivot::new(id, PivotQuality::Good));
            }
        }
        if markowitz.row_count(index) == 0 {
            if let Some(id) = only_in_row(matrix, index, step).filter(|&id| acceptable(id)) {
                return Some(Pivot::new(id, PivotQuality::Good));
            }
        }

        remaining -= 1;
        if remaining == 0 {
            break;
        }
    }
    None
}

fn only_in_column<T: Scalar>(matrix: &SparseMatrix<T>, column: usize, step: usize) -> Option<ElementId> {
    matrix
        .last_in_column(column)
        .filter(|&id| matrix[id].row() >= step)
}

fn only_in_row<T: Scalar>(matrix: &SparseMatrix<T>, row: usize, step: usize) -> Option<ElementId> {
    matrix
        .last_in_row(row)
        .filter(|&id| matrix[id].column() >= step)
}
