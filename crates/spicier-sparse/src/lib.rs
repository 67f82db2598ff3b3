//! Sparse matrix structures for the Spicier linear solver.
//!
//! This crate provides the element graph that the pivoting LU solver works
//! on: a square matrix whose nonzero elements are linked to their row and
//! column neighbours, a sparse right-hand side vector, and the translation
//! tables between external (circuit) and internal (pivoted) indices.
//!
//! Indices are 1-based. Row or column 0 is the ground node: asking for an
//! element there yields a shared trash-can element that is never linked into
//! the matrix, so stamps to ground disappear.

pub mod element;
pub mod error;
pub mod io;
pub mod matrix;
pub mod scalar;
pub mod translation;
pub mod vector;

pub use element::{Element, ElementId};
pub use error::{Error, Result};
pub use io::{CoordinateMatrix, read_matrix, read_vector};
pub use matrix::{ColumnIter, RowIter, SparseMatrix};
pub use scalar::Scalar;
pub use translation::Translation;
pub use vector::{SparseVector, VectorElement, VectorElementId};
