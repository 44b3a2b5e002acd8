use super::Float;

impl Float for f64 {
    const ZERO: Self = 0.0;
    const HALF: Self = 0.5;
    const ONE: Self = 1.0;

    #[inline]
    fn as_f32(&self) -> f32 {
        *self as f32
    }

    #[inline]
    fn as_f64(&self) -> f64 {
        *self
    }

    #[inline]
    fn from_float<F: Float>(float: F) -> Self {
        float.as_f64()
    }

    // =================================== Arithmetic functions ===================================

    #[inline]
    fn abs(&self) -> Self {
        f64::abs(*self)
    }

    #[inline]
    fn max(&self, other: Self) -> Self {
        f64::max(*self, other)
    }
}

#[test]
fn test_f64_float() {
    assert_eq!(<f64 as Float>::from_float(0.5_f32), 0.5);
    assert_eq!(<f64 as Float>::from_usize(4), 4.0);

    assert_eq!(<f64 as Float>::HALF * 3.0, 1.5);

    assert_eq!(Float::max(&-1.0_f64, 0.0), 0.0);
    assert_eq!(Float::max(&f64::NAN, 2.0), 2.0);
}
