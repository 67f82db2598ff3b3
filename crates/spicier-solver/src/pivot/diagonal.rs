//! Full diagonal search.

use std::iter;

use spicier_sparse::{ElementId, Scalar, SparseMatrix};

use super::{Pivot, PivotQuality, largest_other_in_column};
use crate::markowitz::Markowitz;

/// Search the whole active diagonal for the lowest Markowitz product.
///
/// The diagonal at `step` is looked at first since it needs no exchange,
/// then the rest from the bottom up. Among equal products the candidate
/// with the smallest `largest / magnitude` ratio wins, but the scan gives
/// up after `product * ties_multiplier` ties.
pub(super) fn find<T: Scalar>(
    markowitz: &Markowitz<T>,
    matrix: &SparseMatrix<T>,
    step: usize,
) -> Option<Pivot> {
    let config = markowitz.config();
    let mut chosen: Option<ElementId> = None;
    let mut min_product = i64::MAX;
    let mut accepted_ratio = 0.0;
    let mut ties = 0i64;

    let order = iter::once(step).chain((step + 1..=markowitz.limit()).rev());
    for i in order {
        let product = i64::from(markowitz.product(i));
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
        let largest = largest_other_in_column(markowitz, matrix, diagonal, step);
        if magnitude <= config.relative_pivot_threshold * largest {
            continue;
        }

        let ratio = largest / magnitude;
        if product < min_product {
            chosen = Some(diagonal);
            min_product = product;
            accepted_ratio = ratio;
            ties = 0;
        } else {
            ties += 1;
            if ratio < accepted_ratio {
                chosen = Some(diagonal);
                accepted_ratio = ratio;
            }
            if ties >= min_product * i64::from(config.ties_multiplier) {
                break;
            }
        }
    }
    chosen.map(|id| Pivot::new(id, PivotQuality::Suboptimal))
}

#[cfg(test)]
mod tests {
    use spicier_sparse::SparseVector;

    use super::*;

    fn setup(entries: &[(usize, usize, f64)]) -> (SparseMatrix<f64>, Markowitz<f64>) {
        let mut matrix = SparseMatrix::new();
        for &(r, c, v) in entries {
            let id = matrix.get_element(r, c);
            matrix.set_value(id, v);
        }
        let mut markowitz = Markowitz::new();
        markowitz
            .setup(&matrix, &SparseVector::new(), 1, matrix.size(), f64::magnitude)
            .unwrap();
        (matrix, markowitz)
    }

    #[test]
    fn tie_goes_to_better_ratio() {
        // Both diagonals have product 1, diagonal 2 dominates its column more
        let (matrix, markowitz) = setup(&[(1, 1, 1.0), (1, 2, 1.0), (2, 1, 1.0), (2, 2, 5.0)]);
        let pivot = find(&markowitz, &matrix, 1).unwrap();
        assert_eq!(pivot.element, matrix.find_diagonal_element(2).unwrap());
    }

    #[test]
    fn skips_unstable_diagonal() {
        // | 1     1 |
        // | 2000  1 |  diagonal 1 is too small relative to (2, 1)
        let (matrix, markowitz) = setup(&[(1, 1, 1.0), (1, 2, 1.0), (2, 1, 2000.0), (2, 2, 1.0)]);
        let pivot = find(&markowitz, &matrix, 1).unwrap();
        assert_eq!(pivot.element, matrix.find_diagonal_element(2).unwrap());
    }

    #[test]
    fn no_usable_diagonal() {
        let (matrix, markowitz) = setup(&[(1, 2, 1.0), (2, 1, 1.0), (2, 2, 1e-9)]);
        assert!(find(&markowitz, &matrix, 1).is_none());
    }

    #[test]
    fn ties_cutoff_ends_the_scan() {
        // Three 2x2 blocks, every diagonal has product 1. The scan visits
        // 1, 6, 5, 4, 3, 2 and diagonal 5 has the best ratio.
        let mut entries = Vec::new();
        for (first, a, b) in [(1, 2.0, 2.0), (3, 2.0, 2.0), (5, 100.0, 3.0)] {
            entries.extend([
                (first, first, a),
                (first, first + 1, 1.0),
                (first + 1, first, 1.0),
                (first + 1, first + 1, b),
            ]);
        }
        let (matrix, mut markowitz) = setup(&entries);
        let pivot = find(&markowitz, &matrix, 1).unwrap();
        assert_eq!(pivot.element, matrix.find_diagonal_element(5).unwrap());

        // One tie allowed: only 1 and 6 are compared
        markowitz.config_mut().ties_multiplier = 1;
        let pivot = find(&markowitz, &matrix, 1).unwrap();
        assert_eq!(pivot.element, matrix.find_diagonal_element(6).unwrap());
    }

    #[test]
    fn diagonals_past_the_limit_are_ignored() {
        // | 1  1 |
        // | 1  9 |  diagonal 2 would win but lies past the limit
        let mut matrix = SparseMatrix::new();
        for (r, c, v) in [(1, 1, 1.0), (1, 2, 1.0), (2, 1, 1.0), (2, 2, 9.0)] {
            let id = matrix.get_element(r, c);
            matrix.set_value(id, v);
        }
        let mut markowitz = Markowitz::new();
        markowitz
            .setup(&matrix, &SparseVector::new(), 1, 1, f64::magnitude)
            .unwrap();
        let pivot = find(&markowitz, &matrix, 1).unwrap();
        assert_eq!(pivot.element, matrix.find_diagonal_element(1).unwrap());
    }
}
