//! Structural preordering for modified nodal analysis (MNA) matrices.
//!
//! MNA stamps a voltage source as an extra row and column holding ±1 at
//! the nodes it connects, with nothing on the diagonal of its branch:
//!
//! ```text
//! | ? ... 1 |
//! | .  \  . |
//! | 1 ... 0 |
//! ```
//!
//! The two ones are twins. Exchanging their columns puts both of them on
//! the diagonal, so the pivot search starts from a matrix without
//! structural zeros on the diagonal. A branch between two nodes has two
//! pairs of twins; those are handled after every lone pair is gone.

use spicier_sparse::{Scalar, SparseMatrix, Translation};

use crate::error::Result;

/// Twins found in the column of a missing diagonal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Twins {
    None,
    /// Exactly one pair, with the column holding the other twin.
    One(usize),
    /// Two or more pairs, with the column of the first one.
    Many(usize),
}

/// Exchange columns until no missing diagonal in `1..=size` has a lone
/// pair of twins left. Returns the number of exchanges.
pub(crate) fn preorder<T: Scalar>(
    matrix: &mut SparseMatrix<T>,
    columns: &mut Translation,
    size: usize,
) -> Result<usize> {
    let mut swaps = 0;
    let mut start = 1;
    loop {
        let mut swapped = false;
        let mut another_pass = false;

        for j in start..=size {
            if matrix.find_diagonal_element(j).is_some() {
                continue;
            }
            match find_twins(matrix, j, size) {
                Twins::One(partner) => {
                    swap_columns(matrix, columns, partner, j)?;
                    swaps += 1;
                    swapped = true;
                }
                Twins::Many(_) if !another_pass => {
                    another_pass = true;
                    start = j;
                }
                _ => {}
            }
        }
        if !another_pass {
            break;
        }

        // Lone twins are gone, settle one of the shared ones and look again
        if !swapped {
            let mut found = None;
            for j in start..=size {
                if matrix.find_diagonal_element(j).is_some() {
                    continue;
                }
                if let Twins::One(partner) | Twins::Many(partner) = find_twins(matrix, j, size) {
                    found = Some((partner, j));
                    break;
                }
            }
            let Some((partner, j)) = found else {
                break;
            };
            swap_columns(matrix, columns, partner, j)?;
            swaps += 1;
        }
    }
    Ok(swaps)
}

/// Look for elements of magnitude one in `column` whose transposed
/// position also holds magnitude one.
fn find_twins<T: Scalar>(matrix: &SparseMatrix<T>, column: usize, size: usize) -> Twins {
    let mut first = None;
    for id in matrix.column(column) {
        let element = &matrix[id];
        let row = element.row();
        if row > size {
            break;
        }
        if element.value().magnitude() != 1.0 {
            continue;
        }
        let mirrored = matrix
            .find_element(column, row)
            .is_some_and(|twin| matrix[twin].value().magnitude() == 1.0);
        if mirrored {
            match first {
                Some(partner) => return Twins::Many(partner),
                None => first = Some(row),
            }
        }
    }
    first.map_or(Twins::None, Twins::One)
}

fn swap_columns<T: Scalar>(
    matrix: &mut SparseMatrix<T>,
    columns: &mut Translation,
    a: usize,
    b: usize,
) -> Result<()> {
    log::trace!("preorder: exchanging columns {a} and {b}");
    matrix.swap_columns(a, b)?;
    columns.swap(a, b);
    Ok(())
}
