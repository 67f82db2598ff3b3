//! Error types for spicier-solver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("singular matrix at elimination step {step}")]
    Singular { step: usize },

    #[error("invalid elimination step {step} (steps start at 1)")]
    InvalidStep { step: usize },

    #[error("element {0} does not belong to this matrix")]
    UnknownElement(spicier_sparse::ElementId),

    #[error("pivot search limit {max} exceeds matrix size {size}")]
    InvalidSearchLimit { max: usize, size: usize },

    #[error("index {index} lies beyond the pivot search limit {max}")]
    BeyondSearchLimit { index: usize, max: usize },

    #[error("invalid pivot configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid dimensions: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("matrix has not been factored")]
    NotFactored,

    #[error("matrix has no pivot ordering yet")]
    NotOrdered,

    #[error(transparent)]
    Sparse(#[from] spicier_sparse::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
