use ndarray::{Array1, ArrayBase, Data, Ix1, ShapeError};

use super::prelude::*;

/// Compute L2 loss of the regression outputs and its gradient.
///
/// `x[i]` is the predicted value for the i-th example and `y[i]`
/// is its expected value. Both arrays have shape `(N,)`.
///
/// - `loss = 1 / (2N) * Σ (y - x)^2`
/// - `dx = -1 / N * (y - x)`
///
/// This is the last layer of the network, so it doesn't take
/// an upstream gradient: `dx` is where backward propagation starts.
///
/// Returns `IncompatibleShape` error if the arrays have different
/// lengths, or if they're empty.
///
/// ```
/// use ndarray::array;
/// use backproplib::prelude::*;
///
/// let (loss, dx) = l2_loss(&array![0.0, 0.0], &array![1.0, 1.0]).unwrap();
///
/// assert_eq!(loss, 0.5);
/// assert_eq!(dx, array![-0.5, -0.5]);
/// ```
pub fn l2_loss<F, S1, S2>(
    x: &ArrayBase<S1, Ix1>,
    y: &ArrayBase<S2, Ix1>
) -> Result<(F, Array1<F>), ShapeError>
where
    F: Float,
    S1: Data<Elem = F>,
    S2: Data<Elem = F>
{
    if x.len() != y.len() || x.is_empty() {
        return Err(incompatible_shape());
    }

    let n = F::from_usize(x.len());

    let diff = y - x;

    let loss = F::HALF * diff.mapv(|d| d * d).sum() / n;
    let dx = diff * (-F::ONE / n);

    Ok((loss, dx))
}

#[test]
fn test_l2_loss_exact_prediction() -> Result<(), ShapeError> {
    use ndarray::array;

    let (loss, dx) = l2_loss(&array![1.0, 2.0, 3.0], &array![1.0, 2.0, 3.0])?;

    assert_eq!(loss, 0.0);
    assert_eq!(dx, array![0.0, 0.0, 0.0]);

    Ok(())
}

#[test]
fn test_l2_loss_values() -> Result<(), ShapeError> {
    use ndarray::array;

    let (loss, dx) = l2_loss(&array![0.0, 0.0], &array![1.0, 1.0])?;

    assert_eq!(loss, 0.5);
    assert_eq!(dx, array![-0.5, -0.5]);

    // Overshooting the target gives positive gradients.
    let (loss, dx) = l2_loss(&array![3.0_f32, -1.0, 2.0, 0.0], &array![1.0, -1.0, 0.0, 0.0])?;

    approx::assert_relative_eq!(loss, 1.0);
    approx::assert_relative_eq!(dx[0], 0.5);
    approx::assert_relative_eq!(dx[1], 0.0);
    approx::assert_relative_eq!(dx[2], 0.5);

    Ok(())
}

#[test]
fn test_l2_loss_non_negative() -> Result<(), ShapeError> {
    let mut rng = fastrand::Rng::with_seed(3);

    for n in 1..20 {
        let x = super::gradient_check::random_array(&mut rng, n) * 10.0;
        let y = super::gradient_check::random_array(&mut rng, n) * 10.0;

        let (loss, dx) = l2_loss(&x, &y)?;

        assert!(loss >= 0.0);
        assert_eq!(dx.len(), n);
    }

    Ok(())
}

#[test]
fn test_l2_loss_gradient_matches_numerical() -> Result<(), ShapeError> {
    let mut rng = fastrand::Rng::with_seed(11);

    let x = super::gradient_check::random_array(&mut rng, 8);
    let y = super::gradient_check::random_array(&mut rng, 8);

    let (_, dx) = l2_loss(&x, &y)?;
    let dx_num = numerical_gradient(|x| Ok(l2_loss(x, &y)?.0), &x, 1e-5)?;

    assert!(relative_error(&dx, &dx_num)? < 1e-7);

    Ok(())
}

#[test]
fn test_l2_loss_shape_mismatch() {
    use ndarray::{array, Array1, ErrorKind};

    let err = l2_loss(&array![1.0, 2.0], &array![1.0]).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IncompatibleShape);

    let empty = Array1::<f64>::zeros(0);

    assert!(l2_loss(&empty, &empty).is_err());
}
