//! Pivoting thresholds.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Thresholds that decide whether a pivot candidate is numerically safe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotConfig {
    /// A pivot must be larger than this fraction of the largest other
    /// active element in its column.
    pub relative_pivot_threshold: f64,
    /// A pivot must be larger than this magnitude.
    pub absolute_pivot_threshold: f64,
    /// The diagonal and entire-matrix searches give up looking for a better
    /// candidate after `product * ties_multiplier` candidates with the same
    /// product.
    pub ties_multiplier: i32,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            relative_pivot_threshold: 1e-3,
            absolute_pivot_threshold: 0.0,
            ties_multiplier: 5,
        }
    }
}

impl PivotConfig {
    /// Check that the thresholds are usable.
    pub fn validate(&self) -> Result<()> {
        let relative = self.relative_pivot_threshold;
        if !(relative > 0.0 && relative <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "relative pivot threshold must be in (0, 1], got {relative}"
            )));
        }
        let absolute = self.absolute_pivot_threshold;
        if !(absolute >= 0.0 && absolute.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "absolute pivot threshold must be finite and non-negative, got {absolute}"
            )));
        }
        if self.ties_multiplier < 1 {
            return Err(Error::InvalidConfig(format!(
                "ties multiplier must be at least 1, got {}",
                self.ties_multiplier
            )));
        }
        Ok(())
    }
}
