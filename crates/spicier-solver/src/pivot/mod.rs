//! Pivot search strategies.
//!
//! A pivot search is a chain of strategies tried in order; the first one
//! that finds a candidate wins. The default chain goes from the cheapest
//! search to the most thorough one:
//!
//! 1. [`PivotStrategy::Singleton`]: rows or columns with a single active element,
//! 2. [`PivotStrategy::QuickDiagonal`]: the diagonal, stopping at obvious winners,
//! 3. [`PivotStrategy::Diagonal`]: the diagonal, comparing every candidate,
//! 4. [`PivotStrategy::EntireMatrix`]: every active element.

mod diagonal;
mod entire_matrix;
mod quick_diagonal;
mod singleton;

use std::fmt;

use serde::{Deserialize, Serialize};
use spicier_sparse::{ElementId, Scalar, SparseMatrix};

use crate::error::Result;
use crate::markowitz::Markowitz;

/// How much a chosen pivot can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PivotQuality {
    /// No better pivot exists for this step.
    Good,
    /// Acceptable, but a better pivot might have been missed.
    Suboptimal,
    /// Fails the stability thresholds; only the largest element was left.
    Bad,
}

impl fmt::Display for PivotQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Good => "good",
            Self::Suboptimal => "suboptimal",
            Self::Bad => "bad",
        };
        write!(f, "{name}")
    }
}

/// A pivot chosen by a search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pivot {
    pub element: ElementId,
    pub quality: PivotQuality,
}

impl Pivot {
    pub fn new(element: ElementId, quality: PivotQuality) -> Self {
        Self { element, quality }
    }
}

/// One step of the pivot search chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PivotStrategy {
    Singleton,
    QuickDiagonal,
    Diagonal,
    EntireMatrix,
}

impl PivotStrategy {
    /// The search chain used unless a tracker is built with another one.
    pub const DEFAULT_CHAIN: [PivotStrategy; 4] = [
        Self::Singleton,
        Self::QuickDiagonal,
        Self::Diagonal,
        Self::EntireMatrix,
    ];

    /// Parse from string (for CLI and config files).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "singleton" => Some(Self::Singleton),
            "quick-diagonal" | "quick" => Some(Self::QuickDiagonal),
            "diagonal" => Some(Self::Diagonal),
            "entire-matrix" | "entire" => Some(Self::EntireMatrix),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::QuickDiagonal => "quick-diagonal",
            Self::Diagonal => "diagonal",
            Self::EntireMatrix => "entire-matrix",
        }
    }

    /// Search the active submatrix from `step` up to the tracker's search
    /// limit.
    ///
    /// Only [`PivotStrategy::EntireMatrix`] can fail, when every remaining
    /// element is zero.
    pub fn find<T: Scalar>(
        self,
        markowitz: &Markowitz<T>,
        matrix: &SparseMatrix<T>,
        step: usize,
    ) -> Result<Option<Pivot>> {
        match self {
            Self::Singleton => Ok(singleton::find(markowitz, matrix, step)),
            Self::QuickDiagonal => Ok(quick_diagonal::find(markowitz, matrix, step)),
            Self::Diagonal => Ok(diagonal::find(markowitz, matrix, step)),
            Self::EntireMatrix => entire_matrix::find(markowitz, matrix, step),
        }
    }
}

impl fmt::Display for PivotStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Largest magnitude in the active part of `element`'s column, excluding
/// `element` itself. Rows past the search limit are left out.
fn largest_other_in_column<T: Scalar>(
    markowitz: &Markowitz<T>,
    matrix: &SparseMatrix<T>,
    element: ElementId,
    step: usize,
) -> f64 {
    let mut largest = 0.0f64;
    let mut cursor = matrix[element].below();
    while let Some(id) = cursor {
        if matrix[id].row() > markowitz.limit() {
            break;
        }
        largest = largest.max(markowitz.magnitude(&matrix[id].value()));
        cursor = matrix[id].below();
    }
    let mut cursor = matrix[element].above();
    while let Some(id) = cursor {
        if matrix[id].row() < step {
            break;
        }
        largest = largest.max(markowitz.magnitude(&matrix[id].value()));
        cursor = matrix[id].above();
    }
    largest
}
