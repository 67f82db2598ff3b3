//! Matrix elements and the handles that address them.

use std::fmt;

/// Handle to an element of a [`SparseMatrix`](crate::SparseMatrix).
///
/// Handles stay valid for the lifetime of the matrix (until
/// [`clear`](crate::SparseMatrix::clear)) and follow their element when rows
/// or columns are swapped, so device stamps can cache them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    /// The trash-can element that collects writes to row or column 0.
    pub const TRASH: ElementId = ElementId(0);

    /// Get the arena slot of this element.
    pub fn index(self) -> usize {
        self.0
    }

    /// Check if this is the trash-can element.
    pub fn is_trash(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_trash() {
            write!(f, "#trash")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// One nonzero cell of a sparse matrix.
///
/// Within a row the elements are linked left to right by increasing column,
/// within a column top to bottom by increasing row.
#[derive(Debug, Clone)]
pub struct Element<T> {
    pub(crate) row: usize,
    pub(crate) column: usize,
    pub(crate) value: T,
    pub(crate) left: Option<ElementId>,
    pub(crate) right: Option<ElementId>,
    pub(crate) above: Option<ElementId>,
    pub(crate) below: Option<ElementId>,
}

impl<T: Copy> Element<T> {
    pub(crate) fn new(row: usize, column: usize, value: T) -> Self {
        Self {
            row,
            column,
            value,
            left: None,
            right: None,
            above: None,
            below: None,
        }
    }

    /// Current (internal) row of the element.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Current (internal) column of the element.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Value stored in the element.
    pub fn value(&self) -> T {
        self.value
    }

    /// Previous element in the same row.
    pub fn left(&self) -> Option<ElementId> {
        self.left
    }

    /// Next element in the same row.
    pub fn right(&self) -> Option<ElementId> {
        self.right
    }

    /// Previous element in the same column.
    pub fn above(&self) -> Option<ElementId> {
        self.above
    }

    /// Next element in the same column.
    pub fn below(&self) -> Option<ElementId> {
        self.below
    }

    /// Check whether the element sits on the diagonal.
    pub fn is_diagonal(&self) -> bool {
        self.row == self.column
    }
}
