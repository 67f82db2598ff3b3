//! Entire-matrix search, the last resort of the chain.

use spicier_sparse::{ElementId, Scalar, SparseMatrix};

use super::{Pivot, PivotQuality};
use crate::error::{Error, Result};
use crate::markowitz::Markowitz;

/// Search every active element inside the search limit, column by column.
///
/// When no element passes the thresholds the largest one is returned with
/// [`PivotQuality::Bad`]. If even that is zero the matrix is singular.
pub(super) fn find<T: Scalar>(
    markowitz: &Markowitz<T>,
    matrix: &SparseMatrix<T>,
    step: usize,
) -> Result<Option<Pivot>> {
    let config = markowitz.config();
    let mut chosen: Option<ElementId> = None;
    let mut min_product = i64::MAX;
    let mut accepted_ratio = 0.0;
    let mut ties = 0i64;
    let mut largest_element: Option<ElementId> = None;
    let mut largest_magnitude = 0.0;

    let max = markowitz.limit();
    for column in step..=max {
        let largest_in_column = largest_active(markowitz, matrix, column, step);
        if largest_in_column == 0.0 {
            continue;
        }

        let mut cursor = matrix.last_in_column(column);
        while let Some(id) = cursor {
            let element = &matrix[id];
            if element.row() < step {
                break;
            }
            cursor = element.above();
            if element.row() > max {
                continue;
            }

            let magnitude = markowitz.magnitude(&element.value());
            if magnitude > largest_magnitude {
                largest_element = Some(id);
                largest_magnitude = magnitude;
            }

            let product = i64::from(markowitz.row_count(element.row()))
                * i64::from(markowitz.column_count(element.column()));
            if product > min_product
                || magnitude <= config.relative_pivot_threshold * largest_in_column
                || magnitude <= config.absolute_pivot_threshold
            {
                continue;
            }

            let ratio = largest_in_column / magnitude;
            if product < min_product {
                chosen = Some(id);
                min_product = product;
                accepted_ratio = ratio;
                ties = 0;
            } else {
                ties += 1;
                if ratio < accepted_ratio {
                    chosen = Some(id);
                    accepted_ratio = ratio;
                }
                if ties >= min_product * i64::from(config.ties_multiplier) {
                    return Ok(chosen.map(|id| Pivot::new(id, PivotQuality::Suboptimal)));
                }
            }
        }
    }

    if let Some(id) = chosen {
        return Ok(Some(Pivot::new(id, PivotQuality::Suboptimal)));
    }
    match largest_element {
        Some(id) if largest_magnitude > 0.0 => {
            log::warn!(
                "step {}: no pivot passes the thresholds, using largest element ({}, {}) with magnitude {:e}",
                step,
                matrix[id].row(),
                matrix[id].column(),
                largest_magnitude
            );
            Ok(Some(Pivot::new(id, PivotQuality::Bad)))
        }
        _ => Err(Error::Singular { step }),
    }
}

/// Largest magnitude among the active elements of a column, rows
/// `step..=limit` only.
fn largest_active<T: Scalar>(
    markowitz: &Markowitz<T>,
    matrix: &SparseMatrix<T>,
    column: usize,
    step: usize,
) -> f64 {
    let mut largest = 0.0f64;
    let mut cursor = matrix.last_in_column(column);
    while let Some(id) = cursor {
        let element = &matrix[id];
        if element.row() < step {
            break;
        }
        if element.row() <= markowitz.limit() {
            largest = largest.max(markowitz.magnitude(&element.value()));
        }
        cursor = element.above();
    }
    largest
}
