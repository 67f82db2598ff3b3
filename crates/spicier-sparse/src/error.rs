//! Error types for spicier-sparse.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("index {index} out of range (size {size})")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
