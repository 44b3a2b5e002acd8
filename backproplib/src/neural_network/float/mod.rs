use std::ops::*;

use ndarray::{LinalgScalar, ScalarOperand};

mod f32;
mod f64;

/// Generic float numbers representation used by every layer function.
///
/// Besides plain arithmetic the type must be usable as an ndarray
/// element in matrix products (`LinalgScalar`) and as a scalar operand
/// of array expressions (`ScalarOperand`).
///
/// Both `f32` and `f64` implement this trait. Prefer `f64` when
/// comparing analytic gradients with numerical ones, because central
/// differences lose roughly half of the available precision.
pub trait Float:
    LinalgScalar + ScalarOperand +
    AddAssign + SubAssign + MulAssign + DivAssign + Neg<Output = Self> +
    Default + PartialOrd + std::fmt::Debug + std::fmt::Display + Send + Sync
{
    /// Constant equal to `Self::from_float(0.0)`.
    ///
    /// Use `-Float::ZERO` for negative zero.
    const ZERO: Self;

    /// Constant equal to `Self::from_float(0.5)`.
    const HALF: Self;

    /// Constant equal to `Self::from_float(1.0)`.
    const ONE: Self;

    /// Represent current float as machine f32.
    fn as_f32(&self) -> f32;

    /// Represent current float as machine f64 (double precision).
    fn as_f64(&self) -> f64;

    /// Convert given float to another type.
    fn from_float<F: Float>(float: F) -> Self;

    /// Convert amount of elements (batch size, for example) to the float.
    fn from_usize(value: usize) -> Self {
        Self::from_float(value as f64)
    }

    // =================================== Arithmetic functions ===================================

    /// Computes the absolute value of self.
    fn abs(&self) -> Self {
        Self::from_float(self.as_f64().abs())
    }

    /// Returns the maximum of two numbers.
    ///
    /// Unlike `Ord::max` this is defined for floats. If one of the
    /// arguments is NaN then the other one is returned.
    fn max(&self, other: Self) -> Self {
        Self::from_float(self.as_f64().max(other.as_f64()))
    }
}
