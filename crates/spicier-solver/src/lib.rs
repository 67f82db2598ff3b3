//! Sparse LU solver with Markowitz pivoting for Spicier.
//!
//! This crate provides:
//! - Markowitz count bookkeeping ([`Markowitz`])
//! - A chain of pivot search strategies ([`PivotStrategy`])
//! - A sparse LU driver that orders, factors and solves ([`SparseLuSolver`]),
//!   with an optional MNA preordering pass
//!
//! The element graph it works on lives in `spicier-sparse`.

pub mod config;
pub mod error;
pub mod lu;
pub mod markowitz;
pub mod pivot;
mod preorder;

pub use config::PivotConfig;
pub use error::{Error, Result};
pub use lu::SparseLuSolver;
pub use markowitz::{CountMismatch, MAX_MARKOWITZ_COUNT, Markowitz};
pub use pivot::{Pivot, PivotQuality, PivotStrategy};
