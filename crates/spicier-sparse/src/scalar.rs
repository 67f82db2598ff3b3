//! Value types that can live in a sparse matrix.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use num_complex::Complex64 as C64;

/// A matrix value.
///
/// Pivot selection only looks at [`Scalar::magnitude`], a real projection of
/// the value. Elimination and substitution use the arithmetic operators.
pub trait Scalar:
    Copy
    + Debug
    + Default
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// Additive identity.
    fn zero() -> Self;

    /// Multiplicative identity.
    fn one() -> Self;

    /// Real-valued size used to compare pivot candidates.
    fn magnitude(&self) -> f64;

    /// Check whether the value is exactly zero.
    fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

impl Scalar for f64 {
    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn magnitude(&self) -> f64 {
        self.abs()
    }
}

/// Complex values use the 1-norm `|re| + |im|`, as SPICE does, which avoids
/// a square root for every candidate.
impl Scalar for C64 {
    fn zero() -> Self {
        C64::new(0.0, 0.0)
    }

    fn one() -> Self {
        C64::new(1.0, 0.0)
    }

    fn magnitude(&self) -> f64 {
        self.re.abs() + self.im.abs()
    }
}
