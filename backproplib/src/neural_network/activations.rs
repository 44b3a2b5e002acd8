use ndarray::{Array, ArrayBase, ArrayView, Data, Dimension, ShapeError, Zip};

use super::prelude::*;

#[derive(Debug, Clone)]
/// Input of the `relu_forward` call, remembered for `relu_backward`.
pub struct ReluCache<'a, F: Float, D: Dimension> {
    /// Raw pre-activation values.
    pub x: ArrayView<'a, F, D>
}

#[inline]
/// `max(0, x)`
///
/// NaN input is returned as is.
pub fn relu<F: Float>(x: F) -> F {
    if x < F::ZERO { F::ZERO } else { x }
}

/// Compute forward pass of a layer of rectified linear units.
///
/// Input can have any shape. Output is a newly allocated array
/// of the same shape, the cache remembers the untouched input.
///
/// ```
/// use ndarray::array;
/// use backproplib::prelude::*;
///
/// let x = array![[-1.0, 0.0], [0.5, 2.0]];
///
/// let (out, cache) = relu_forward(&x);
///
/// assert_eq!(out, array![[0.0, 0.0], [0.5, 2.0]]);
///
/// let dx = relu_backward(&array![[1.0, 1.0], [1.0, 1.0]], cache).unwrap();
///
/// assert_eq!(dx, array![[0.0, 0.0], [1.0, 1.0]]);
/// ```
pub fn relu_forward<'a, F: Float, S: Data<Elem = F>, D: Dimension>(
    x: &'a ArrayBase<S, D>
) -> (Array<F, D>, ReluCache<'a, F, D>) {
    let x = x.view();

    (x.mapv(relu), ReluCache { x })
}

/// Compute backward pass of a layer of rectified linear units.
///
/// Returns a copy of `dout` where every position with cached input
/// `x <= 0` is set to zero. `dout` itself is never changed.
///
/// Returns `IncompatibleShape` error if `dout` and the cached input
/// have different shapes.
pub fn relu_backward<F: Float, S: Data<Elem = F>, D: Dimension>(
    dout: &ArrayBase<S, D>,
    cache: ReluCache<'_, F, D>
) -> Result<Array<F, D>, ShapeError> {
    ensure_same_shape(&dout.raw_dim(), &cache.x.raw_dim())?;

    let mut dx = dout.to_owned();

    Zip::from(&mut dx)
        .and(&cache.x)
        .for_each(|dx, &x| {
            if x <= F::ZERO {
                *dx = F::ZERO;
            }
        });

    Ok(dx)
}

#[test]
fn test_relu_scalar() {
    assert_eq!(relu(-1.5), 0.0);
    assert_eq!(relu(0.0), 0.0);
    assert_eq!(relu(2.5_f32), 2.5);
    assert!(relu(f64::NAN).is_nan());
}

#[test]
fn test_relu_keeps_non_negative_input() {
    use ndarray::array;

    let x = array![[0.0, 1.0, 2.5], [3.0, 0.25, 100.0]];

    let (out, _) = relu_forward(&x);

    assert_eq!(out, x);
}

#[test]
fn test_relu_blocks_gradient() -> Result<(), ShapeError> {
    use ndarray::array;

    let x = array![-1.0, 0.0, 2.0];
    let dout = array![1.0, 1.0, 1.0];

    let (out, cache) = relu_forward(&x);

    assert_eq!(out, array![0.0, 0.0, 2.0]);

    let dx = relu_backward(&dout, cache)?;

    assert_eq!(dx, array![0.0, 0.0, 1.0]);

    // Upstream gradient stays untouched.
    assert_eq!(dout, array![1.0, 1.0, 1.0]);

    Ok(())
}

#[test]
/// Changing the forward output must not affect the backward pass.
fn test_relu_output_doesnt_alias_cache() -> Result<(), ShapeError> {
    use ndarray::array;

    let x = array![-2.0, 3.0, -0.5, 4.0];

    let (mut out, cache) = relu_forward(&x);

    // Zeroing the whole output must not change the gradient mask.
    out.fill(0.0);

    let dx = relu_backward(&array![5.0, 6.0, 7.0, 8.0], cache)?;

    assert_eq!(dx, array![0.0, 6.0, 0.0, 8.0]);

    Ok(())
}

#[test]
fn test_relu_passes_nan_through() -> Result<(), ShapeError> {
    use ndarray::array;

    let x = array![f64::NAN, 1.0, -0.0];

    let (out, cache) = relu_forward(&x);

    assert!(out[0].is_nan());
    assert_eq!(out[1], 1.0);
    assert_eq!(out[2], 0.0);

    // `NaN <= 0` is false, so the gradient isn't blocked.
    let dx = relu_backward(&array![5.0, 6.0, 7.0], cache)?;

    assert_eq!(dx, array![5.0, 6.0, 0.0]);

    Ok(())
}

#[test]
fn test_relu_dynamic_dimensions() -> Result<(), ShapeError> {
    use ndarray::{ArrayD, IxDyn};

    let x = ArrayD::from_shape_fn(IxDyn(&[2, 3, 4]), |idx| idx[0] as f64 - idx[2] as f64);
    let dout = ArrayD::from_elem(IxDyn(&[2, 3, 4]), 2.0);

    let (out, cache) = relu_forward(&x);

    assert_eq!(out.shape(), &[2, 3, 4]);

    let dx = relu_backward(&dout, cache)?;

    for (dx, x) in dx.iter().zip(x.iter()) {
        assert_eq!(*dx, if *x > 0.0 { 2.0 } else { 0.0 });
    }

    Ok(())
}

#[test]
fn test_relu_gradient_matches_numerical() -> Result<(), ShapeError> {
    let mut rng = fastrand::Rng::with_seed(7);

    // Keep inputs away from the kink at zero.
    let x = super::gradient_check::random_array(&mut rng, (3, 5))
        .mapv(|x| if x.abs() < 0.05 { x + 0.1 } else { x });

    let dout = super::gradient_check::random_array(&mut rng, (3, 5));

    let (_, cache) = relu_forward(&x);

    let dx = relu_backward(&dout, cache)?;
    let dx_num = numerical_gradient_array(|x| Ok(relu_forward(x).0), &x, &dout, 1e-5)?;

    assert!(relative_error(&dx, &dx_num)? < 1e-8);

    Ok(())
}

#[test]
fn test_relu_shape_mismatch() {
    use ndarray::{array, ErrorKind};

    let x = array![1.0, -1.0];

    let (_, cache) = relu_forward(&x);

    let err = relu_backward(&array![1.0, 1.0, 1.0], cache).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IncompatibleShape);
}
