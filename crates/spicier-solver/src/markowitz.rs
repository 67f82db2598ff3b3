//! Markowitz pivot bookkeeping.
//!
//! For every index `i` in the search window `step..=max` the tracker keeps
//!
//! - `row_count[i]`: other active elements in row `i`, plus one when the
//!   right-hand side has an entry in that row,
//! - `column_count[i]`: other active elements in column `i`,
//! - `product[i] = row_count[i] * column_count[i]`,
//!
//! and the number of indices in the window with a zero product
//! (singletons). A low product means that eliminating a pivot at that
//! position creates few fill-ins. The counts are set up once per
//! factorization and then updated incrementally as pivots are moved into
//! place and eliminated.
//!
//! `max` is the pivot search limit: rows and columns past it are never
//! chosen as pivots, although their elements still count towards the rows
//! and columns inside the window.

use spicier_sparse::{Element, ElementId, Scalar, SparseMatrix, SparseVector};
use thiserror::Error;

use crate::config::PivotConfig;
use crate::error::{Error, Result};
use crate::pivot::{Pivot, PivotStrategy};

/// Largest count kept by the tracker, `floor(sqrt(i32::MAX))`, so that the
/// product of two counts always fits in an `i32`.
pub const MAX_MARKOWITZ_COUNT: i32 = 46_340;

/// A tracker value that does not match a recount from the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{what}[{index}] is {actual}, expected {expected}")]
pub struct CountMismatch {
    pub what: &'static str,
    pub index: usize,
    pub expected: i64,
    pub actual: i64,
}

/// Markowitz counts, products and singletons for one matrix.
#[derive(Debug, Clone)]
pub struct Markowitz<T> {
    row_count: Vec<i32>,
    column_count: Vec<i32>,
    product: Vec<i32>,
    rhs_in_row: Vec<bool>,
    singletons: usize,
    limit: usize,
    config: PivotConfig,
    strategies: Vec<PivotStrategy>,
    magnitude: fn(&T) -> f64,
}

impl<T: Scalar> Default for Markowitz<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> Markowitz<T> {
    /// Create a tracker with default thresholds and the default search chain.
    pub fn new() -> Self {
        Self::with_config(PivotConfig::default())
    }

    pub fn with_config(config: PivotConfig) -> Self {
        Self::with_strategies(config, PivotStrategy::DEFAULT_CHAIN.to_vec())
    }

    /// Create a tracker that searches with a custom strategy chain.
    pub fn with_strategies(config: PivotConfig, strategies: Vec<PivotStrategy>) -> Self {
        Self {
            row_count: Vec::new(),
            column_count: Vec::new(),
            product: Vec::new(),
            rhs_in_row: Vec::new(),
            singletons: 0,
            limit: 0,
            config,
            strategies,
            magnitude: T::magnitude,
        }
    }

    pub fn config(&self) -> &PivotConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PivotConfig {
        &mut self.config
    }

    pub fn strategies(&self) -> &[PivotStrategy] {
        &self.strategies
    }

    /// Size of the matrix the counts were set up for.
    pub fn size(&self) -> usize {
        self.row_count.len().saturating_sub(1)
    }

    /// Largest row or column index a pivot may have, as given to
    /// [`setup`](Self::setup).
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn row_count(&self, index: usize) -> i32 {
        self.row_count[index]
    }

    pub fn column_count(&self, index: usize) -> i32 {
        self.column_count[index]
    }

    pub fn product(&self, index: usize) -> i32 {
        self.product[index]
    }

    /// Number of indices in the search window with a zero Markowitz product.
    pub fn singletons(&self) -> usize {
        self.singletons
    }

    /// Magnitude used to compare pivot candidates.
    pub fn magnitude(&self, value: &T) -> f64 {
        (self.magnitude)(value)
    }

    /// Count the active part of the matrix for the window `step..=max`.
    ///
    /// The count arrays are reallocated only when the matrix size changed.
    pub fn setup(
        &mut self,
        matrix: &SparseMatrix<T>,
        rhs: &SparseVector<T>,
        step: usize,
        max: usize,
        magnitude: fn(&T) -> f64,
    ) -> Result<()> {
        if step == 0 {
            return Err(Error::InvalidStep { step });
        }
        let size = matrix.size();
        if max > size {
            return Err(Error::InvalidSearchLimit { max, size });
        }
        self.magnitude = magnitude;
        self.limit = max;

        if self.row_count.len() != size + 1 {
            self.row_count = vec![0; size + 1];
            self.column_count = vec![0; size + 1];
            self.product = vec![0; size + 1];
            self.rhs_in_row = vec![false; size + 1];
        }

        for i in (step..=max).rev() {
            self.rhs_in_row[i] = rhs.find_element(i).is_some();
            self.row_count[i] = self.recount_row(matrix, i, step);
            self.column_count[i] = recount_column(matrix, i, step);
        }

        self.singletons = 0;
        for i in step..=max {
            self.product[i] = self.row_count[i] * self.column_count[i];
            if self.product[i] == 0 {
                self.singletons += 1;
            }
        }
        Ok(())
    }

    /// Forget the counts. The next [`setup`](Self::setup) reallocates.
    pub fn clear(&mut self) {
        self.row_count = Vec::new();
        self.column_count = Vec::new();
        self.product = Vec::new();
        self.rhs_in_row = Vec::new();
        self.singletons = 0;
        self.limit = 0;
    }

    /// Check whether an element is numerically acceptable as a pivot.
    ///
    /// The candidate must lie inside `max` and be strictly larger than the
    /// relative threshold times the largest element below it in its column,
    /// up to row `max`.
    pub fn is_valid_pivot(
        &self,
        matrix: &SparseMatrix<T>,
        candidate: ElementId,
        max: usize,
    ) -> Result<bool> {
        let element = lookup(matrix, candidate)?;
        if element.row() > max || element.column() > max {
            return Ok(false);
        }
        let magnitude = self.magnitude(&element.value());

        let mut largest = 0.0f64;
        let mut cursor = element.below();
        while let Some(id) = cursor {
            if matrix[id].row() > max {
                break;
            }
            largest = largest.max(self.magnitude(&matrix[id].value()));
            cursor = matrix[id].below();
        }
        Ok(magnitude > self.config.relative_pivot_threshold * largest)
    }

    /// Run the strategy chain and return the first pivot found.
    ///
    /// Returns `Ok(None)` past the search limit. The default chain ends with
    /// the entire-matrix search, which fails with [`Error::Singular`] rather
    /// than returning nothing.
    pub fn find_pivot(&self, matrix: &SparseMatrix<T>, step: usize) -> Result<Option<Pivot>> {
        if step == 0 {
            return Err(Error::InvalidStep { step });
        }
        if step > self.limit {
            return Ok(None);
        }
        self.check_size(matrix)?;

        for strategy in &self.strategies {
            if let Some(pivot) = strategy.find(self, matrix, step)? {
                log::trace!(
                    "step {}: {} pivot ({}, {}) via {}",
                    step,
                    pivot.quality,
                    matrix[pivot.element].row(),
                    matrix[pivot.element].column(),
                    strategy
                );
                return Ok(Some(pivot));
            }
        }
        Ok(None)
    }

    /// Account for a pivot about to be swapped into (`step`, `step`).
    ///
    /// Must be called before the rows and columns are exchanged. The pivot's
    /// row and column counts move to index `step`, which leaves the active
    /// set.
    pub fn move_pivot(&mut self, matrix: &SparseMatrix<T>, pivot: ElementId, step: usize) -> Result<()> {
        if step == 0 {
            return Err(Error::InvalidStep { step });
        }
        self.check_size(matrix)?;
        let element = lookup(matrix, pivot)?;
        let (row, column) = (element.row(), element.column());
        let furthest = step.max(row).max(column);
        if furthest > self.limit {
            return Err(Error::BeyondSearchLimit {
                index: furthest,
                max: self.limit,
            });
        }

        let mut affected = vec![step, row, column];
        affected.sort_unstable();
        affected.dedup();

        let before = affected.iter().filter(|&&i| self.product[i] == 0).count();
        self.row_count.swap(row, step);
        self.rhs_in_row.swap(row, step);
        self.column_count.swap(column, step);
        for &i in &affected {
            self.product[i] = self.row_count[i] * self.column_count[i];
        }
        let after = affected
            .iter()
            .filter(|&&i| i != step && self.product[i] == 0)
            .count();
        self.singletons = self.singletons + after - before;
        Ok(())
    }

    /// Account for an element created by the elimination of the current step.
    ///
    /// Only the counts inside the search window are touched.
    pub fn create_fillin(&mut self, matrix: &SparseMatrix<T>, fillin: ElementId) -> Result<()> {
        let element = lookup(matrix, fillin)?;
        let (row, column) = (element.row(), element.column());

        if row <= self.limit {
            let was_zero = self.product[row] == 0;
            self.row_count[row] = (self.row_count[row] + 1).min(MAX_MARKOWITZ_COUNT);
            self.refresh(row, was_zero);
        }
        if column <= self.limit {
            let was_zero = self.product[column] == 0;
            self.column_count[column] = (self.column_count[column] + 1).min(MAX_MARKOWITZ_COUNT);
            self.refresh(column, was_zero);
        }
        Ok(())
    }

    /// Remove the eliminated pivot row and column from the counts.
    ///
    /// Called after the elimination of `step`, with the pivot at
    /// (`step`, `step`). Every element below the pivot loses one from its row
    /// count, every element right of it one from its column count. A count
    /// sitting at [`MAX_MARKOWITZ_COUNT`] is recounted instead, since the
    /// cap hides how far above it the real count is.
    pub fn update(&mut self, matrix: &SparseMatrix<T>, pivot: ElementId, step: usize) -> Result<()> {
        if step == 0 {
            return Err(Error::InvalidStep { step });
        }
        let element = lookup(matrix, pivot)?;

        let mut cursor = element.below();
        while let Some(id) = cursor {
            let row = matrix[id].row();
            if row > self.limit {
                break;
            }
            let was_zero = self.product[row] == 0;
            self.row_count[row] = if self.row_count[row] == MAX_MARKOWITZ_COUNT {
                self.recount_row(matrix, row, step + 1)
            } else {
                self.row_count[row] - 1
            };
            self.refresh(row, was_zero);
            cursor = matrix[id].below();
        }

        let mut cursor = element.right();
        while let Some(id) = cursor {
            let column = matrix[id].column();
            if column > self.limit {
                break;
            }
            let was_zero = self.product[column] == 0;
            self.column_count[column] = if self.column_count[column] == MAX_MARKOWITZ_COUNT {
                recount_column(matrix, column, step + 1)
            } else {
                self.column_count[column] - 1
            };
            self.refresh(column, was_zero);
            cursor = matrix[id].right();
        }
        Ok(())
    }

    /// Recount the window from `step` on and compare with the tracker.
    ///
    /// Debugging aid for the incremental updates.
    pub fn check_counts(
        &self,
        matrix: &SparseMatrix<T>,
        rhs: &SparseVector<T>,
        step: usize,
    ) -> std::result::Result<(), CountMismatch> {
        let mismatch = |what, index, expected: i64, actual: i64| CountMismatch {
            what,
            index,
            expected,
            actual,
        };

        let mut singletons = 0;
        for i in step..=self.limit {
            let extra = i32::from(rhs.find_element(i).is_some());
            let rows = (active_in_row(matrix, i, step) - 1 + extra).min(MAX_MARKOWITZ_COUNT);
            let columns = recount_column(matrix, i, step);
            if self.row_count[i] != rows {
                return Err(mismatch("row_count", i, rows.into(), self.row_count[i].into()));
            }
            if self.column_count[i] != columns {
                return Err(mismatch(
                    "column_count",
                    i,
                    columns.into(),
                    self.column_count[i].into(),
                ));
            }
            if self.product[i] != rows * columns {
                return Err(mismatch(
                    "product",
                    i,
                    (rows * columns).into(),
                    self.product[i].into(),
                ));
            }
            if self.product[i] == 0 {
                singletons += 1;
            }
        }
        if singletons != self.singletons {
            return Err(mismatch(
                "singletons",
                step,
                singletons as i64,
                self.singletons as i64,
            ));
        }
        Ok(())
    }

    /// Recompute a product after one of its counts changed.
    fn refresh(&mut self, index: usize, was_zero: bool) {
        self.product[index] = self.row_count[index] * self.column_count[index];
        match (was_zero, self.product[index] == 0) {
            (true, false) => self.singletons -= 1,
            (false, true) => self.singletons += 1,
            _ => {}
        }
    }

    /// Capped row count of `row` for the active part starting at `step`.
    fn recount_row(&self, matrix: &SparseMatrix<T>, row: usize, step: usize) -> i32 {
        let extra = i32::from(self.rhs_in_row[row]);
        (active_in_row(matrix, row, step) - 1 + extra).min(MAX_MARKOWITZ_COUNT)
    }

    fn check_size(&self, matrix: &SparseMatrix<T>) -> Result<()> {
        if self.size() != matrix.size() {
            return Err(Error::DimensionMismatch {
                expected: matrix.size(),
                actual: self.size(),
            });
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_singletons(&mut self, singletons: usize) {
        self.singletons = singletons;
    }
}

/// Resolve a handle, refusing the trash can.
fn lookup<T: Scalar>(matrix: &SparseMatrix<T>, id: ElementId) -> Result<&Element<T>> {
    if id.is_trash() {
        return Err(Error::UnknownElement(id));
    }
    matrix.get(id).ok_or(Error::UnknownElement(id))
}

/// Capped column count of `column` for the active part starting at `step`.
fn recount_column<T: Scalar>(matrix: &SparseMatrix<T>, column: usize, step: usize) -> i32 {
    (active_in_column(matrix, column, step) - 1).min(MAX_MARKOWITZ_COUNT)
}

/// Elements of `row` with a column index of at least `step`.
fn active_in_row<T: Scalar>(matrix: &SparseMatrix<T>, row: usize, step: usize) -> i32 {
    let mut count = 0i32;
    let mut cursor = matrix.last_in_row(row);
    while let Some(id) = cursor {
        if matrix[id].column() < step {
            break;
        }
        count = count.saturating_add(1);
        cursor = matrix[id].left();
    }
    count
}

/// Elements of `column` with a row index of at least `step`.
fn active_in_column<T: Scalar>(matrix: &SparseMatrix<T>, column: usize, step: usize) -> i32 {
    let mut count = 0i32;
    let mut cursor = matrix.last_in_column(column);
    while let Some(id) = cursor {
        if matrix[id].row() < step {
            break;
        }
        count = count.saturating_add(1);
        cursor = matrix[id].above();
    }
    count
}
