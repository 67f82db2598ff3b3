//! Square sparse matrix stored as an element graph.
//!
//! Elements live in an arena and are addressed through [`ElementId`]
//! handles. Every element is linked into two sorted doubly-linked lists: its
//! row (by increasing column) and its column (by increasing row). Header
//! tables give the first and last element of every row and column, and a
//! diagonal table gives O(1) access to the pivots.
//!
//! ```text
//!            col 1      col 2      col 3
//!  row 1   [ 4.0 ] --> [ 1.0 ]
//!             |           |
//!  row 2      |        [ 5.0 ]
//!             v
//!  row 3   [ 2.0 ] -------------> [ 3.0 ]
//! ```
//!
//! Walking `right` (or `below`) always sees increasing indices, so callers
//! can skip the eliminated part of a line with an early exit.

use std::ops::Index;

use nalgebra::DMatrix;

use crate::element::{Element, ElementId};
use crate::error::{Error, Result};
use crate::scalar::Scalar;

/// First and last element of a row or column.
#[derive(Debug, Clone, Copy, Default)]
struct Line {
    first: Option<ElementId>,
    last: Option<ElementId>,
}

/// A square sparse matrix with linked rows and columns.
///
/// The matrix grows automatically when an element outside the current size
/// is requested.
#[derive(Debug, Clone)]
pub struct SparseMatrix<T> {
    /// Element arena. Slot 0 is the trash can.
    elements: Vec<Element<T>>,
    rows: Vec<Line>,
    columns: Vec<Line>,
    diagonal: Vec<Option<ElementId>>,
    size: usize,
}

impl<T: Scalar> Default for SparseMatrix<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> SparseMatrix<T> {
    /// Create an empty matrix.
    pub fn new() -> Self {
        Self::with_size(0)
    }

    /// Create an empty matrix with room for `size` rows and columns.
    pub fn with_size(size: usize) -> Self {
        Self {
            elements: vec![Element::new(0, 0, T::zero())],
            rows: vec![Line::default(); size + 1],
            columns: vec![Line::default(); size + 1],
            diagonal: vec![None; size + 1],
            size,
        }
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of elements in the matrix, excluding the trash can.
    pub fn element_count(&self) -> usize {
        self.elements.len() - 1
    }

    /// Check whether a handle belongs to this matrix.
    pub fn contains(&self, id: ElementId) -> bool {
        id.0 < self.elements.len()
    }

    /// Look up an element by handle.
    pub fn get(&self, id: ElementId) -> Option<&Element<T>> {
        self.elements.get(id.0)
    }

    /// Value of an element.
    pub fn value(&self, id: ElementId) -> T {
        self.elements[id.0].value
    }

    /// Mutable access to the value of an element.
    pub fn value_mut(&mut self, id: ElementId) -> &mut T {
        &mut self.elements[id.0].value
    }

    /// Overwrite the value of an element.
    pub fn set_value(&mut self, id: ElementId, value: T) {
        self.elements[id.0].value = value;
    }

    /// Add to the value of an element (a stamp).
    pub fn add_value(&mut self, id: ElementId, value: T) {
        self.elements[id.0].value += value;
    }

    /// Find or create the element at (`row`, `column`).
    ///
    /// A new element starts at zero and is inserted in order into both its
    /// row and its column. Row or column 0 returns [`ElementId::TRASH`].
    pub fn get_element(&mut self, row: usize, column: usize) -> ElementId {
        if row == 0 || column == 0 {
            return ElementId::TRASH;
        }
        let needed = row.max(column);
        if needed > self.size {
            self.expand(needed);
        }
        if row == column {
            if let Some(diagonal) = self.diagonal[row] {
                return diagonal;
            }
        }

        let before = match self.rows[row].last {
            // Appending is the common case while stamping
            Some(last) if self.elements[last.0].column < column => Some(last),
            _ => match self.row_position(row, column) {
                Ok(existing) => return existing,
                Err(before) => before,
            },
        };

        let id = ElementId(self.elements.len());
        self.elements.push(Element::new(row, column, T::zero()));
        self.insert_in_row(id, before);
        self.link_into_column(id);
        if row == column {
            self.diagonal[row] = Some(id);
        }
        id
    }

    /// Find the element at (`row`, `column`) without creating it.
    pub fn find_element(&self, row: usize, column: usize) -> Option<ElementId> {
        if row == 0 || column == 0 || row > self.size || column > self.size {
            return None;
        }
        if row == column {
            return self.diagonal[row];
        }
        self.find_in_row(row, column)
    }

    /// The diagonal element at index `index`, if it exists.
    pub fn find_diagonal_element(&self, index: usize) -> Option<ElementId> {
        if index == 0 || index > self.size {
            return None;
        }
        self.diagonal[index]
    }

    /// First (leftmost) element of a row.
    pub fn first_in_row(&self, row: usize) -> Option<ElementId> {
        self.line(&self.rows, row).first
    }

    /// Last (rightmost) element of a row.
    pub fn last_in_row(&self, row: usize) -> Option<ElementId> {
        self.line(&self.rows, row).last
    }

    /// First (topmost) element of a column.
    pub fn first_in_column(&self, column: usize) -> Option<ElementId> {
        self.line(&self.columns, column).first
    }

    /// Last (bottom) element of a column.
    pub fn last_in_column(&self, column: usize) -> Option<ElementId> {
        self.line(&self.columns, column).last
    }

    /// Iterate over the elements of a row from left to right.
    pub fn row(&self, row: usize) -> RowIter<'_, T> {
        RowIter {
            matrix: self,
            next: self.first_in_row(row),
        }
    }

    /// Iterate over the elements of a column from top to bottom.
    pub fn column(&self, column: usize) -> ColumnIter<'_, T> {
        ColumnIter {
            matrix: self,
            next: self.first_in_column(column),
        }
    }

    /// Exchange two rows.
    ///
    /// The row headers are swapped and the elements of both rows are
    /// relinked in their columns, so element handles keep pointing at the
    /// same values while their row index changes.
    pub fn swap_rows(&mut self, row1: usize, row2: usize) -> Result<()> {
        self.check_index(row1)?;
        self.check_index(row2)?;
        if row1 == row2 {
            return Ok(());
        }
        let needed = row1.max(row2);
        if needed > self.size {
            self.expand(needed);
        }

        let first: Vec<ElementId> = self.row(row1).collect();
        let second: Vec<ElementId> = self.row(row2).collect();
        self.rows.swap(row1, row2);

        for &id in first.iter().chain(second.iter()) {
            self.unlink_from_column(id);
        }
        for &id in &first {
            self.elements[id.0].row = row2;
        }
        for &id in &second {
            self.elements[id.0].row = row1;
        }
        for &id in first.iter().chain(second.iter()) {
            self.link_into_column(id);
        }

        self.diagonal[row1] = self.find_in_row(row1, row1);
        self.diagonal[row2] = self.find_in_row(row2, row2);
        Ok(())
    }

    /// Exchange two columns.
    pub fn swap_columns(&mut self, column1: usize, column2: usize) -> Result<()> {
        self.check_index(column1)?;
        self.check_index(column2)?;
        if column1 == column2 {
            return Ok(());
        }
        let needed = column1.max(column2);
        if needed > self.size {
            self.expand(needed);
        }

        let first: Vec<ElementId> = self.column(column1).collect();
        let second: Vec<ElementId> = self.column(column2).collect();
        self.columns.swap(column1, column2);

        for &id in first.iter().chain(second.iter()) {
            self.unlink_from_row(id);
        }
        for &id in &first {
            self.elements[id.0].column = column2;
        }
        for &id in &second {
            self.elements[id.0].column = column1;
        }
        for &id in first.iter().chain(second.iter()) {
            self.link_into_row(id);
        }

        self.diagonal[column1] = self.find_in_row(column1, column1);
        self.diagonal[column2] = self.find_in_row(column2, column2);
        Ok(())
    }

    /// Set every value to zero, keeping the structure.
    pub fn reset(&mut self) {
        for element in &mut self.elements {
            element.value = T::zero();
        }
    }

    /// Remove all elements. Previously handed out handles become invalid.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Copy the matrix into a dense `nalgebra` matrix (0-based).
    pub fn to_dense(&self) -> DMatrix<T>
    where
        T: nalgebra::Scalar,
    {
        let mut dense = DMatrix::from_element(self.size, self.size, T::zero());
        for element in self.elements.iter().skip(1) {
            dense[(element.row - 1, element.column - 1)] = element.value;
        }
        dense
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index == 0 {
            return Err(Error::IndexOutOfRange {
                index,
                size: self.size,
            });
        }
        Ok(())
    }

    fn line(&self, lines: &[Line], index: usize) -> Line {
        if index == 0 || index > self.size {
            return Line::default();
        }
        lines[index]
    }

    fn expand(&mut self, size: usize) {
        if size <= self.size {
            return;
        }
        self.rows.resize(size + 1, Line::default());
        self.columns.resize(size + 1, Line::default());
        self.diagonal.resize(size + 1, None);
        self.size = size;
    }

    /// Locate `column` in `row`: the element itself, or the element it
    /// would be inserted after.
    fn row_position(
        &self,
        row: usize,
        column: usize,
    ) -> std::result::Result<ElementId, Option<ElementId>> {
        let mut before = None;
        let mut cursor = self.rows[row].first;
        while let Some(id) = cursor {
            let element = &self.elements[id.0];
            if element.column == column {
                return Ok(id);
            }
            if element.column > column {
                break;
            }
            before = Some(id);
            cursor = element.right;
        }
        Err(before)
    }

    fn find_in_row(&self, row: usize, column: usize) -> Option<ElementId> {
        let mut cursor = self.rows[row].first;
        while let Some(id) = cursor {
            let element = &self.elements[id.0];
            if element.column == column {
                return Some(id);
            }
            if element.column > column {
                return None;
            }
            cursor = element.right;
        }
        None
    }

    /// Link `id` into its row directly after `after` (or at the front).
    fn insert_in_row(&mut self, id: ElementId, after: Option<ElementId>) {
        let row = self.elements[id.0].row;
        let next = match after {
            Some(previous) => self.elements[previous.0].right,
            None => self.rows[row].first,
        };
        self.elements[id.0].left = after;
        self.elements[id.0].right = next;
        match after {
            Some(previous) => self.elements[previous.0].right = Some(id),
            None => self.rows[row].first = Some(id),
        }
        match next {
            Some(following) => self.elements[following.0].left = Some(id),
            None => self.rows[row].last = Some(id),
        }
    }

    /// Link `id` into its column directly after `after` (or at the top).
    fn insert_in_column(&mut self, id: ElementId, after: Option<ElementId>) {
        let column = self.elements[id.0].column;
        let next = match after {
            Some(previous) => self.elements[previous.0].below,
            None => self.columns[column].first,
        };
        self.elements[id.0].above = after;
        self.elements[id.0].below = next;
        match after {
            Some(previous) => self.elements[previous.0].below = Some(id),
            None => self.columns[column].first = Some(id),
        }
        match next {
            Some(following) => self.elements[following.0].above = Some(id),
            None => self.columns[column].last = Some(id),
        }
    }

    fn link_into_row(&mut self, id: ElementId) {
        let (row, column) = (self.elements[id.0].row, self.elements[id.0].column);
        if let Some(last) = self.rows[row].last {
            if self.elements[last.0].column < column {
                self.insert_in_row(id, Some(last));
                return;
            }
        }
        let mut after = None;
        let mut cursor = self.rows[row].first;
        while let Some(current) = cursor {
            if self.elements[current.0].column > column {
                break;
            }
            after = Some(current);
            cursor = self.elements[current.0].right;
        }
        self.insert_in_row(id, after);
    }

    fn link_into_column(&mut self, id: ElementId) {
        let (row, column) = (self.elements[id.0].row, self.elements[id.0].column);
        if let Some(last) = self.columns[column].last {
            if self.elements[last.0].row < row {
                self.insert_in_column(id, Some(last));
                return;
            }
        }
        let mut after = None;
        let mut cursor = self.columns[column].first;
        while let Some(current) = cursor {
            if self.elements[current.0].row > row {
                break;
            }
            after = Some(current);
            cursor = self.elements[current.0].below;
        }
        self.insert_in_column(id, after);
    }

    fn unlink_from_row(&mut self, id: ElementId) {
        let element = &self.elements[id.0];
        let (row, left, right) = (element.row, element.left, element.right);
        match left {
            Some(previous) => self.elements[previous.0].right = right,
            None => self.rows[row].first = right,
        }
        match right {
            Some(next) => self.elements[next.0].left = left,
            None => self.rows[row].last = left,
        }
        self.elements[id.0].left = None;
        self.elements[id.0].right = None;
    }

    fn unlink_from_column(&mut self, id: ElementId) {
        let element = &self.elements[id.0];
        let (column, above, below) = (element.column, element.above, element.below);
        match above {
            Some(previous) => self.elements[previous.0].below = below,
            None => self.columns[column].first = below,
        }
        match below {
            Some(next) => self.elements[next.0].above = above,
            None => self.columns[column].last = above,
        }
        self.elements[id.0].above = None;
        self.elements[id.0].below = None;
    }
}

impl<T> Index<ElementId> for SparseMatrix<T> {
    type Output = Element<T>;

    fn index(&self, id: ElementId) -> &Element<T> {
        &self.elements[id.0]
    }
}

/// Iterator over the elements of a row, left to right.
pub struct RowIter<'a, T> {
    matrix: &'a SparseMatrix<T>,
    next: Option<ElementId>,
}

impl<T> Iterator for RowIter<'_, T> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let id = self.next?;
        self.next = self.matrix.elements[id.0].right;
        Some(id)
    }
}

/// Iterator over the elements of a column, top to bottom.
pub struct ColumnIter<'a, T> {
    matrix: &'a SparseMatrix<T>,
    next: Option<ElementId>,
}

impl<T> Iterator for ColumnIter<'_, T> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let id = self.next?;
        self.next = self.matrix.elements[id.0].below;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Check the ordering invariant and the back links of every line.
    fn check_links(matrix: &SparseMatrix<f64>) {
        for i in 1..=matrix.size() {
            let mut previous: Option<ElementId> = None;
            for id in matrix.row(i) {
                let element = &matrix[id];
                assert_eq!(element.row(), i);
                assert_eq!(element.left(), previous);
                if let Some(p) = previous {
                    assert!(matrix[p].column() < element.column());
                }
                previous = Some(id);
            }
            assert_eq!(matrix.last_in_row(i), previous);

            let mut previous: Option<ElementId> = None;
            for id in matrix.column(i) {
                let element = &matrix[id];
                assert_eq!(element.column(), i);
                assert_eq!(element.above(), previous);
                if let Some(p) = previous {
                    assert!(matrix[p].row() < element.row());
                }
                previous = Some(id);
            }
            assert_eq!(matrix.last_in_column(i), previous);

            match matrix.find_diagonal_element(i) {
                Some(d) => assert!(matrix[d].is_diagonal() && matrix[d].row() == i),
                None => assert!(matrix.row(i).all(|id| matrix[id].column() != i)),
            }
        }
    }

    fn build(entries: &[(usize, usize, f64)]) -> SparseMatrix<f64> {
        let mut matrix = SparseMatrix::new();
        for &(row, column, value) in entries {
            let id = matrix.get_element(row, column);
            matrix.add_value(id, value);
        }
        matrix
    }

    #[test]
    fn elements_are_kept_in_order() {
        let matrix = build(&[(2, 3, 1.0), (2, 1, 2.0), (1, 3, 3.0), (3, 3, 4.0), (2, 2, 5.0)]);
        assert_eq!(matrix.size(), 3);
        assert_eq!(matrix.element_count(), 5);

        let columns: Vec<usize> = matrix.row(2).map(|id| matrix[id].column()).collect();
        assert_eq!(columns, vec![1, 2, 3]);
        let rows: Vec<usize> = matrix.column(3).map(|id| matrix[id].row()).collect();
        assert_eq!(rows, vec![1, 2, 3]);
        check_links(&matrix);
    }

    #[test]
    fn get_element_returns_existing_element() {
        let mut matrix = SparseMatrix::<f64>::new();
        let a = matrix.get_element(2, 1);
        let b = matrix.get_element(2, 1);
        assert_eq!(a, b);
        assert_eq!(matrix.element_count(), 1);
        assert_eq!(matrix.find_element(2, 1), Some(a));
        assert_eq!(matrix.find_element(1, 2), None);
        assert_eq!(matrix.find_element(5, 5), None);
    }

    #[test]
    fn ground_goes_to_trash() {
        let mut matrix = SparseMatrix::<f64>::new();
        let trash = matrix.get_element(0, 3);
        assert!(trash.is_trash());
        matrix.add_value(trash, 10.0);
        assert_eq!(matrix.element_count(), 0);
        assert_eq!(matrix.size(), 0);
        assert!(matrix.swap_rows(0, 1).is_err());
    }

    #[test]
    fn diagonal_is_tracked() {
        let mut matrix = SparseMatrix::<f64>::new();
        let d = matrix.get_element(2, 2);
        assert_eq!(matrix.find_diagonal_element(2), Some(d));
        assert_eq!(matrix.find_diagonal_element(1), None);
        assert_eq!(matrix.get_element(2, 2), d);
    }

    #[test]
    fn swap_rows_moves_elements_and_keeps_handles() {
        // | 1 2 0 |
        // | 0 3 4 |
        // | 5 0 6 |
        let mut matrix = build(&[
            (1, 1, 1.0),
            (1, 2, 2.0),
            (2, 2, 3.0),
            (2, 3, 4.0),
            (3, 1, 5.0),
            (3, 3, 6.0),
        ]);
        let five = matrix.find_element(3, 1).unwrap();
        let one = matrix.find_element(1, 1).unwrap();

        matrix.swap_rows(3, 1).unwrap();
        check_links(&matrix);

        assert_eq!(matrix[five].row(), 1);
        assert_eq!(matrix[one].row(), 3);
        assert_eq!(matrix.find_diagonal_element(1), Some(five));
        assert!(matrix.find_diagonal_element(3).is_none());
        assert_eq!(matrix.find_element(1, 3).map(|id| matrix.value(id)), Some(6.0));
        assert_eq!(matrix.find_element(3, 2).map(|id| matrix.value(id)), Some(2.0));
    }

    #[test]
    fn swap_columns_matches_dense_permutation() {
        let entries = [
            (1, 1, 1.0),
            (1, 3, 2.0),
            (2, 2, 3.0),
            (3, 1, 4.0),
            (3, 2, 5.0),
            (4, 4, 6.0),
            (2, 4, 7.0),
        ];
        let mut matrix = build(&entries);
        let before = matrix.to_dense();

        matrix.swap_columns(1, 4).unwrap();
        check_links(&matrix);
        let after = matrix.to_dense();

        for r in 0..4 {
            assert_eq!(after[(r, 0)], before[(r, 3)]);
            assert_eq!(after[(r, 3)], before[(r, 0)]);
            assert_eq!(after[(r, 1)], before[(r, 1)]);
        }
        assert!(matrix.find_diagonal_element(4).is_none());
        assert!(matrix.find_diagonal_element(1).is_none());
    }

    #[test]
    fn swap_beyond_size_expands() {
        let mut matrix = build(&[(1, 1, 1.0)]);
        matrix.swap_rows(1, 3).unwrap();
        assert_eq!(matrix.size(), 3);
        assert!(matrix.first_in_row(1).is_none());
        assert_eq!(matrix.first_in_row(3).map(|id| matrix[id].column()), Some(1));
        check_links(&matrix);
    }

    #[test]
    fn reset_keeps_structure() {
        let mut matrix = build(&[(1, 1, 1.0), (2, 1, 2.0)]);
        matrix.reset();
        assert_eq!(matrix.element_count(), 2);
        assert!(matrix.row(2).all(|id| matrix.value(id) == 0.0));

        matrix.clear();
        assert_eq!(matrix.size(), 0);
        assert_eq!(matrix.element_count(), 0);
    }
}
