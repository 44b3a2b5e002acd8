use super::Float;

impl Float for f32 {
    const ZERO: Self = 0.0;
    const HALF: Self = 0.5;
    const ONE: Self = 1.0;

    #[inline]
    fn as_f32(&self) -> f32 {
        *self
    }

    #[inline]
    fn as_f64(&self) -> f64 {
        *self as f64
    }

    #[inline]
    fn from_float<F: Float>(float: F) -> Self {
        float.as_f32()
    }

    // =================================== Arithmetic functions ===================================

    #[inline]
    fn abs(&self) -> Self {
        f32::abs(*self)
    }

    #[inline]
    fn max(&self, other: Self) -> Self {
        f32::max(*self, other)
    }
}

#[test]
fn test_f32_float() {
    assert_eq!(<f32 as Float>::from_float(0.25_f64), 0.25);
    assert_eq!(<f32 as Float>::HALF.as_f64(), 0.5);
    assert_eq!(Float::abs(&-2.0_f32), 2.0);
}
