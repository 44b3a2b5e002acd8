use ndarray::{Dimension, ErrorKind, ShapeError};

#[inline]
/// Error returned when operand dimensions can't be combined
/// by the requested array operation.
pub fn incompatible_shape() -> ShapeError {
    ShapeError::from_kind(ErrorKind::IncompatibleShape)
}

#[inline]
/// Return `Err(IncompatibleShape)` unless both shapes are equal.
pub fn ensure_same_shape<D: Dimension>(a: &D, b: &D) -> Result<(), ShapeError> {
    if a.slice() == b.slice() {
        Ok(())
    } else {
        Err(incompatible_shape())
    }
}

#[test]
fn test_ensure_same_shape() {
    use ndarray::{Dim, IxDyn};

    assert!(ensure_same_shape(&Dim([2, 3]), &Dim([2, 3])).is_ok());
    assert!(ensure_same_shape(&IxDyn(&[2, 3, 4]), &IxDyn(&[2, 3, 4])).is_ok());

    let err = ensure_same_shape(&Dim([2, 3]), &Dim([3, 2])).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IncompatibleShape);
}
