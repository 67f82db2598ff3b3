//! Sparse LU solver with Markowitz pivoting.
//!
//! The solver owns the matrix and the right-hand side. Callers stamp values
//! through handles obtained with external (circuit) indices, then call
//! [`SparseLuSolver::order_and_factor`] for the first factorization and
//! [`SparseLuSolver::factor`] or `order_and_factor` again for the following
//! ones. Pivoting permutes rows and columns internally; [`SparseLuSolver::solve`]
//! returns the solution in external order.
//!
//! # Pivot search reduction
//!
//! With [`SparseLuSolver::set_pivot_search_reduction`] the last rows and
//! columns are kept out of the pivot search. They are still eliminated,
//! in place and after every searched step, which keeps equations shared
//! with other systems at the bottom of the ordering.
//!
//! # Factor storage
//!
//! After factorization the matrix holds `L` and `U` in place: each diagonal
//! stores the reciprocal of its pivot, elements below the diagonal hold `L`
//! and elements right of it hold the unit upper triangle `U`.
//!
//! # Example
//!
//! ```
//! use spicier_solver::SparseLuSolver;
//!
//! let mut solver = SparseLuSolver::<f64>::new();
//! for (row, column, value) in [(1, 1, 2.0), (1, 2, 1.0), (2, 1, 1.0), (2, 2, 3.0)] {
//!     let id = solver.get_element(row, column);
//!     solver.add_value(id, value);
//! }
//! solver.set_rhs(&[3.0, 4.0]);
//! solver.order_and_factor().unwrap();
//!
//! let mut x = vec![0.0; 2];
//! solver.solve(&mut x).unwrap();
//! assert!((x[0] - 1.0).abs() < 1e-12 && (x[1] - 1.0).abs() < 1e-12);
//! ```

use spicier_sparse::{
    ElementId, Scalar, SparseMatrix, SparseVector, Translation, VectorElementId,
};

use crate::config::PivotConfig;
use crate::error::{Error, Result};
use crate::markowitz::Markowitz;
use crate::pivot::{Pivot, PivotQuality};
use crate::preorder;

/// LU solver for a square sparse system `A x = b`.
#[derive(Debug, Clone)]
pub struct SparseLuSolver<T> {
    matrix: SparseMatrix<T>,
    rhs: SparseVector<T>,
    markowitz: Markowitz<T>,
    rows: Translation,
    columns: Translation,
    intermediate: Vec<T>,
    is_factored: bool,
    needs_reordering: bool,
    fillins: usize,
    pivot_search_reduction: usize,
}

impl<T: Scalar> Default for SparseLuSolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> SparseLuSolver<T> {
    pub fn new() -> Self {
        Self::with_markowitz(Markowitz::new())
    }

    /// Create a solver with custom pivot thresholds.
    pub fn with_config(config: PivotConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_markowitz(Markowitz::with_config(config)))
    }

    /// Create a solver around a preconfigured tracker (e.g. a custom
    /// strategy chain).
    pub fn with_markowitz(markowitz: Markowitz<T>) -> Self {
        Self {
            matrix: SparseMatrix::new(),
            rhs: SparseVector::new(),
            markowitz,
            rows: Translation::new(),
            columns: Translation::new(),
            intermediate: Vec::new(),
            is_factored: false,
            needs_reordering: true,
            fillins: 0,
            pivot_search_reduction: 0,
        }
    }

    /// Number of unknowns.
    pub fn size(&self) -> usize {
        self.matrix.size()
    }

    /// Number of fill-ins created since the last [`clear`](Self::clear).
    pub fn fillins(&self) -> usize {
        self.fillins
    }

    pub fn is_factored(&self) -> bool {
        self.is_factored
    }

    pub fn needs_reordering(&self) -> bool {
        self.needs_reordering
    }

    pub fn pivot_search_reduction(&self) -> usize {
        self.pivot_search_reduction
    }

    /// Keep the last `reduction` rows and columns out of the pivot search.
    ///
    /// Takes effect at the next reordering, which this requests.
    pub fn set_pivot_search_reduction(&mut self, reduction: usize) {
        if reduction != self.pivot_search_reduction {
            self.pivot_search_reduction = reduction;
            self.needs_reordering = true;
        }
    }

    /// Largest index a pivot may be searched at.
    pub fn search_limit(&self) -> usize {
        self.size().saturating_sub(self.pivot_search_reduction)
    }

    /// Force the next [`order_and_factor`](Self::order_and_factor) to search
    /// new pivots from the first step.
    pub fn request_reordering(&mut self) {
        self.needs_reordering = true;
    }

    /// The matrix in internal (pivoted) order.
    pub fn matrix(&self) -> &SparseMatrix<T> {
        &self.matrix
    }

    /// The right-hand side in internal order.
    pub fn rhs(&self) -> &SparseVector<T> {
        &self.rhs
    }

    pub fn markowitz(&self) -> &Markowitz<T> {
        &self.markowitz
    }

    pub fn markowitz_mut(&mut self) -> &mut Markowitz<T> {
        &mut self.markowitz
    }

    pub fn config_mut(&mut self) -> &mut PivotConfig {
        self.markowitz.config_mut()
    }

    pub fn row_translation(&self) -> &Translation {
        &self.rows
    }

    pub fn column_translation(&self) -> &Translation {
        &self.columns
    }

    /// Find or create the matrix element at external (`row`, `column`).
    ///
    /// Index 0 is ground: the returned handle points at the trash can.
    pub fn get_element(&mut self, row: usize, column: usize) -> ElementId {
        let row = self.rows.to_internal(row);
        let column = self.columns.to_internal(column);
        self.matrix.get_element(row, column)
    }

    /// Find the matrix element at external (`row`, `column`).
    pub fn find_element(&self, row: usize, column: usize) -> Option<ElementId> {
        self.matrix
            .find_element(self.rows.to_internal(row), self.columns.to_internal(column))
    }

    /// Find or create the right-hand side entry of external `row`.
    pub fn get_rhs_element(&mut self, row: usize) -> VectorElementId {
        self.rhs.get_element(self.rows.to_internal(row))
    }

    pub fn value_mut(&mut self, id: ElementId) -> &mut T {
        self.matrix.value_mut(id)
    }

    pub fn set_value(&mut self, id: ElementId, value: T) {
        self.matrix.set_value(id, value);
    }

    pub fn add_value(&mut self, id: ElementId, value: T) {
        self.matrix.add_value(id, value);
    }

    pub fn rhs_value_mut(&mut self, id: VectorElementId) -> &mut T {
        self.rhs.value_mut(id)
    }

    /// Replace the right-hand side with a dense vector in external order.
    ///
    /// `values[k]` belongs to row `k + 1`. Zero entries that were never
    /// stamped stay structurally absent.
    pub fn set_rhs(&mut self, values: &[T]) {
        self.rhs.reset();
        for (k, &value) in values.iter().enumerate() {
            let internal = self.rows.to_internal(k + 1);
            match self.rhs.find_element(internal) {
                Some(id) => self.rhs.set_value(id, value),
                None if !value.is_zero() => {
                    let id = self.rhs.get_element(internal);
                    self.rhs.set_value(id, value);
                }
                None => {}
            }
        }
    }

    /// Zero all values, keeping the structure and the pivot ordering.
    pub fn reset(&mut self) {
        self.matrix.reset();
        self.rhs.reset();
        self.is_factored = false;
    }

    /// Forget everything: elements, ordering and statistics.
    pub fn clear(&mut self) {
        self.matrix.clear();
        self.rhs.clear();
        self.markowitz.clear();
        self.rows.clear();
        self.columns.clear();
        self.intermediate.clear();
        self.is_factored = false;
        self.needs_reordering = true;
        self.fillins = 0;
    }

    /// Exchange columns so that the ±1 twins of voltage-source branches sit
    /// on the diagonal.
    ///
    /// Meant for matrices built with modified nodal analysis, after the
    /// values are stamped and before the first
    /// [`order_and_factor`](Self::order_and_factor). Only rows and columns
    /// up to the search limit are touched. Returns the number of column
    /// exchanges.
    pub fn preorder_modified_nodal_analysis(&mut self) -> Result<usize> {
        let max = self.search_limit();
        let swaps = preorder::preorder(&mut self.matrix, &mut self.columns, max)?;
        if swaps > 0 {
            self.is_factored = false;
            self.needs_reordering = true;
        }
        log::debug!("MNA preordering exchanged {swaps} column pairs");
        Ok(swaps)
    }

    /// Factor the matrix, choosing pivots where needed.
    ///
    /// When a previous ordering exists it is reused as long as every diagonal
    /// passes [`Markowitz::is_valid_pivot`]. At the first diagonal that fails,
    /// a new pivot search starts from that step on. Diagonals past the
    /// search limit are used as they are. Returns the number of eliminated
    /// steps.
    pub fn order_and_factor(&mut self) -> Result<usize> {
        let size = self.matrix.size();
        let max = self.search_limit();
        self.is_factored = false;

        let mut step = 1;
        if !self.needs_reordering {
            while step <= size {
                let Some(pivot) = self.matrix.find_diagonal_element(step) else {
                    break;
                };
                if step <= max && !self.markowitz.is_valid_pivot(&self.matrix, pivot, max)? {
                    break;
                }
                self.eliminate(pivot, step, false)?;
                step += 1;
            }
            if step > size {
                self.is_factored = true;
                return Ok(size);
            }
            log::warn!("pivot at step {step} is no longer acceptable, reordering from there");
            self.needs_reordering = true;
        }

        log::debug!("reordering {size}x{size} matrix from step {step}, searching up to {max}");
        self.setup_pivoting(step)?;
        while step <= size {
            self.pivot_step(step)?;
            step += 1;
        }

        self.is_factored = true;
        self.needs_reordering = false;
        log::debug!(
            "factored {}x{} matrix, {} elements, {} fill-ins",
            size,
            size,
            self.matrix.element_count(),
            self.fillins
        );
        Ok(size)
    }

    /// Factor the matrix again with the existing ordering.
    ///
    /// The values must have been restamped since the last factorization.
    pub fn factor(&mut self) -> Result<()> {
        if self.needs_reordering {
            return Err(Error::NotOrdered);
        }
        self.is_factored = false;
        for step in 1..=self.matrix.size() {
            let pivot = self
                .matrix
                .find_diagonal_element(step)
                .ok_or(Error::Singular { step })?;
            self.eliminate(pivot, step, false)?;
        }
        self.is_factored = true;
        Ok(())
    }

    /// Count the active submatrix before searching pivots from `step` on.
    pub fn setup_pivoting(&mut self, step: usize) -> Result<()> {
        let max = self.search_limit();
        self.markowitz
            .setup(&self.matrix, &self.rhs, step, max, T::magnitude)
    }

    /// One step of a reordering: search a pivot, move it to (`step`,
    /// `step`), eliminate it and update the Markowitz counts.
    ///
    /// Past the search limit the diagonal is eliminated where it is and
    /// reported as [`PivotQuality::Suboptimal`].
    pub fn pivot_step(&mut self, step: usize) -> Result<Pivot> {
        if step == 0 {
            return Err(Error::InvalidStep { step });
        }
        if step > self.search_limit() {
            let pivot = self.diagonal(step)?;
            self.eliminate(pivot, step, false)?;
            return Ok(Pivot::new(pivot, PivotQuality::Suboptimal));
        }
        let pivot = self
            .markowitz
            .find_pivot(&self.matrix, step)?
            .ok_or(Error::Singular { step })?;
        self.move_pivot(pivot.element, step)?;
        self.eliminate(pivot.element, step, true)?;
        self.markowitz.update(&self.matrix, pivot.element, step)?;
        Ok(pivot)
    }

    /// Solve `A x = b` with the stamped right-hand side.
    ///
    /// `solution[k]` receives unknown `k + 1`.
    pub fn solve(&mut self, solution: &mut [T]) -> Result<()> {
        let size = self.check_solve(solution)?;
        let mut intermediate = self.load_intermediate(size);
        for (index, value) in self.rhs.iter() {
            if index <= size {
                intermediate[index] = value;
            }
        }

        // Forward substitution with L
        for i in 1..=size {
            let mut temp = intermediate[i];
            if temp.is_zero() {
                continue;
            }
            let pivot = self.diagonal(i)?;
            temp *= self.matrix.value(pivot);
            intermediate[i] = temp;
            let mut cursor = self.matrix[pivot].below();
            while let Some(id) = cursor {
                let element = &self.matrix[id];
                intermediate[element.row()] -= temp * element.value();
                cursor = element.below();
            }
        }

        // Backward substitution with U
        for i in (1..=size).rev() {
            let mut temp = intermediate[i];
            let pivot = self.diagonal(i)?;
            let mut cursor = self.matrix[pivot].right();
            while let Some(id) = cursor {
                let element = &self.matrix[id];
                temp -= element.value() * intermediate[element.column()];
                cursor = element.right();
            }
            intermediate[i] = temp;
        }

        self.columns.unscramble(&intermediate, solution);
        self.intermediate = intermediate;
        Ok(())
    }

    /// Solve `Aᵀ x = b` with the stamped right-hand side.
    ///
    /// `b` is read by external row; `solution[k]` receives unknown `k + 1`.
    pub fn solve_transposed(&mut self, solution: &mut [T]) -> Result<()> {
        let size = self.check_solve(solution)?;
        let mut intermediate = self.load_intermediate(size);
        for (index, value) in self.rhs.iter() {
            if index <= size {
                let external = self.rows.to_external(index);
                intermediate[self.columns.to_internal(external)] = value;
            }
        }

        // Forward substitution with Uᵀ
        for i in 1..=size {
            let temp = intermediate[i];
            if temp.is_zero() {
                continue;
            }
            let mut cursor = self.matrix[self.diagonal(i)?].right();
            while let Some(id) = cursor {
                let element = &self.matrix[id];
                intermediate[element.column()] -= temp * element.value();
                cursor = element.right();
            }
        }

        // Backward substitution with Lᵀ
        for i in (1..=size).rev() {
            let mut temp = intermediate[i];
            let pivot = self.diagonal(i)?;
            let mut cursor = self.matrix[pivot].below();
            while let Some(id) = cursor {
                let element = &self.matrix[id];
                temp -= intermediate[element.row()] * element.value();
                cursor = element.below();
            }
            intermediate[i] = temp * self.matrix.value(pivot);
        }

        self.rows.unscramble(&intermediate, solution);
        self.intermediate = intermediate;
        Ok(())
    }

    /// Bring the pivot to (`step`, `step`).
    fn move_pivot(&mut self, pivot: ElementId, step: usize) -> Result<()> {
        self.markowitz.move_pivot(&self.matrix, pivot, step)?;

        let (row, column) = (self.matrix[pivot].row(), self.matrix[pivot].column());
        if row != step {
            self.matrix.swap_rows(row, step)?;
            self.rhs.swap_elements(row, step);
            self.rows.swap(row, step);
        }
        if column != step {
            self.matrix.swap_columns(column, step)?;
            self.columns.swap(column, step);
        }
        Ok(())
    }

    /// Eliminate the pivot at (`step`, `step`) from the rows below it.
    ///
    /// With `track` set, fill-ins are reported to the Markowitz counts.
    fn eliminate(&mut self, pivot: ElementId, step: usize, track: bool) -> Result<()> {
        let value = self.matrix.value(pivot);
        if value.is_zero() {
            return Err(Error::Singular { step });
        }
        let inverse = T::one() / value;
        self.matrix.set_value(pivot, inverse);

        let mut upper = self.matrix[pivot].right();
        while let Some(u) = upper {
            let scaled = self.matrix.value(u) * inverse;
            self.matrix.set_value(u, scaled);
            let column = self.matrix[u].column();

            let mut sub = self.matrix[u].below();
            let mut lower = self.matrix[pivot].below();
            while let Some(l) = lower {
                let row = self.matrix[l].row();
                while let Some(s) = sub {
                    if self.matrix[s].row() >= row {
                        break;
                    }
                    sub = self.matrix[s].below();
                }

                let target = match sub {
                    Some(s) if self.matrix[s].row() == row => s,
                    _ => {
                        let fillin = self.matrix.get_element(row, column);
                        self.fillins += 1;
                        if track {
                            self.markowitz.create_fillin(&self.matrix, fillin)?;
                        }
                        fillin
                    }
                };
                let product = scaled * self.matrix.value(l);
                *self.matrix.value_mut(target) -= product;

                sub = self.matrix[target].below();
                lower = self.matrix[l].below();
            }
            upper = self.matrix[u].right();
        }
        Ok(())
    }

    fn diagonal(&self, step: usize) -> Result<ElementId> {
        self.matrix
            .find_diagonal_element(step)
            .ok_or(Error::Singular { step })
    }

    fn check_solve(&self, solution: &[T]) -> Result<usize> {
        if !self.is_factored {
            return Err(Error::NotFactored);
        }
        let size = self.matrix.size();
        if solution.len() != size {
            return Err(Error::DimensionMismatch {
                expected: size,
                actual: solution.len(),
            });
        }
        Ok(size)
    }

    fn load_intermediate(&mut self, size: usize) -> Vec<T> {
        let mut intermediate = std::mem::take(&mut self.intermediate);
        intermediate.clear();
        intermediate.resize(size + 1, T::zero());
        intermediate
    }
}
