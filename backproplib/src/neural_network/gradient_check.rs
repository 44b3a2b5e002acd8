//! Numerical gradients for validating hand-written backward passes.
//!
//! Every function here evaluates the forward pass twice per input
//! element, so it's only meant for small arrays in tests and sanity checks.

use ndarray::{Array, ArrayBase, Data, Dimension, ErrorKind, ShapeError};

use super::prelude::*;

/// Copy given array into a standard layout buffer which can be
/// accessed as a flat slice.
fn flat_copy<F: Float, S: Data<Elem = F>, D: Dimension>(x: &ArrayBase<S, D>) -> Result<Array<F, D>, ShapeError> {
    Array::from_shape_vec(x.raw_dim(), x.iter().copied().collect())
}

/// Set `i`-th element (in logical order) of the standard layout array.
fn set<F: Float, D: Dimension>(array: &mut Array<F, D>, i: usize, value: F) -> Result<(), ShapeError> {
    let slice = array.as_slice_mut()
        .ok_or_else(|| ShapeError::from_kind(ErrorKind::IncompatibleLayout))?;

    slice[i] = value;

    Ok(())
}

/// Evaluate numerical gradient of the scalar function `f` at `x`
/// using centered formula `(f(x + h) - f(x - h)) / 2h`.
///
/// Returned array has the same shape as `x`. `x` itself is not changed.
///
/// ```
/// use ndarray::array;
/// use backproplib::prelude::*;
///
/// // d/dx Σ x^2 = 2x
/// let x = array![1.0, -2.0, 0.5];
///
/// let grad = numerical_gradient(|x| Ok(x.mapv(|v| v * v).sum()), &x, 1e-5).unwrap();
///
/// assert!(relative_error(&grad, &array![2.0, -4.0, 1.0]).unwrap() < 1e-8);
/// ```
pub fn numerical_gradient<F, S, D>(
    mut f: impl FnMut(&Array<F, D>) -> Result<F, ShapeError>,
    x: &ArrayBase<S, D>,
    h: F
) -> Result<Array<F, D>, ShapeError>
where
    F: Float,
    S: Data<Elem = F>,
    D: Dimension
{
    let mut point = flat_copy(x)?;
    let mut grad = Vec::with_capacity(x.len());

    for (i, &value) in x.iter().enumerate() {
        set(&mut point, i, value + h)?;
        let plus = f(&point)?;

        set(&mut point, i, value - h)?;
        let minus = f(&point)?;

        set(&mut point, i, value)?;

        grad.push((plus - minus) / (h + h));
    }

    Array::from_shape_vec(x.raw_dim(), grad)
}

/// Evaluate numerical gradient of the array function `f` at `x`
/// weighted by the upstream gradient `dout`.
///
/// This is the numerical counterpart of a layer's backward pass:
/// for each element `x[i]` it computes `Σ (f(x + h) - f(x - h)) * dout / 2h`.
///
/// Returns `IncompatibleShape` error if the shape of `f(x)` differs from `dout`.
pub fn numerical_gradient_array<F, S, T, D, E>(
    mut f: impl FnMut(&Array<F, D>) -> Result<Array<F, E>, ShapeError>,
    x: &ArrayBase<S, D>,
    dout: &ArrayBase<T, E>,
    h: F
) -> Result<Array<F, D>, ShapeError>
where
    F: Float,
    S: Data<Elem = F>,
    T: Data<Elem = F>,
    D: Dimension,
    E: Dimension
{
    let mut point = flat_copy(x)?;
    let mut grad = Vec::with_capacity(x.len());

    for (i, &value) in x.iter().enumerate() {
        set(&mut point, i, value + h)?;
        let plus = f(&point)?;

        set(&mut point, i, value - h)?;
        let minus = f(&point)?;

        set(&mut point, i, value)?;

        ensure_same_shape(&plus.raw_dim(), &dout.raw_dim())?;
        ensure_same_shape(&minus.raw_dim(), &dout.raw_dim())?;

        let mut sum = F::ZERO;

        for ((plus, minus), dout) in plus.iter().zip(minus.iter()).zip(dout.iter()) {
            sum += (*plus - *minus) * *dout;
        }

        grad.push(sum / (h + h));
    }

    Array::from_shape_vec(x.raw_dim(), grad)
}

/// Maximal relative error between two arrays:
/// `max |a - b| / max(1e-8, |a| + |b|)`.
///
/// Returns zero for empty arrays and `IncompatibleShape` error
/// if the shapes differ.
pub fn relative_error<F, S, T, D>(a: &ArrayBase<S, D>, b: &ArrayBase<T, D>) -> Result<F, ShapeError>
where
    F: Float,
    S: Data<Elem = F>,
    T: Data<Elem = F>,
    D: Dimension
{
    ensure_same_shape(&a.raw_dim(), &b.raw_dim())?;

    let floor = F::from_float(1e-8);

    let error = a.iter()
        .zip(b.iter())
        .map(|(a, b)| (*a - *b).abs() / (a.abs() + b.abs()).max(floor))
        .fold(F::ZERO, |acc, err| acc.max(err));

    Ok(error)
}

#[cfg(test)]
/// Array of the given shape filled with uniform random values from `[-1, 1)`.
pub(crate) fn random_array<D: Dimension>(rng: &mut fastrand::Rng, shape: impl ndarray::ShapeBuilder<Dim = D>) -> Array<f64, D> {
    Array::from_shape_simple_fn(shape, || rng.f64() * 2.0 - 1.0)
}

#[test]
fn test_numerical_gradient_of_polynomial() -> Result<(), ShapeError> {
    use ndarray::array;

    // f(x) = Σ x^3, f'(x) = 3x^2
    let x = array![[1.0, -1.0], [0.5, 2.0]];

    let grad = numerical_gradient(|x| Ok(x.mapv(|v| v * v * v).sum()), &x, 1e-5)?;

    assert!(relative_error(&grad, &array![[3.0, 3.0], [0.75, 12.0]])? < 1e-8);

    // Input stays unchanged.
    assert_eq!(x, array![[1.0, -1.0], [0.5, 2.0]]);

    Ok(())
}

#[test]
fn test_numerical_gradient_array_of_elementwise_function() -> Result<(), ShapeError> {
    use ndarray::array;

    // f(x) = 2x, so the gradient is 2 * dout.
    let x = array![0.3, -0.7, 1.1];
    let dout = array![1.0, 2.0, -3.0];

    let grad = numerical_gradient_array(|x| Ok(x * 2.0), &x, &dout, 1e-5)?;

    assert!(relative_error(&grad, &array![2.0, 4.0, -6.0])? < 1e-8);

    Ok(())
}

#[test]
fn test_numerical_gradient_array_handles_non_standard_layout() -> Result<(), ShapeError> {
    // Transposed view isn't contiguous in the standard order.
    let x = ndarray::array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
    let xt = x.t();

    let dout = Array::from_elem((3, 2), 1.0);

    let grad = numerical_gradient_array(|x| Ok(x.mapv(|v| v * v)), &xt, &dout, 1e-5)?;

    assert!(relative_error(&grad, &(&xt * 2.0))? < 1e-8);

    Ok(())
}

#[test]
fn test_numerical_gradient_array_shape_mismatch() {
    use ndarray::array;

    let x = array![1.0, 2.0];

    let err = numerical_gradient_array(|x| Ok(x.clone()), &x, &array![1.0, 2.0, 3.0], 1e-5).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IncompatibleShape);
}

#[test]
fn test_relative_error() -> Result<(), ShapeError> {
    use ndarray::{array, Array1};

    let a = array![1.0, 2.0, 0.0];

    assert_eq!(relative_error(&a, &a)?, 0.0);

    approx::assert_relative_eq!(relative_error(&a, &array![1.0, 2.2, 0.0])?, (2.2 - 2.0) / (2.0 + 2.2), max_relative = 1e-12);

    let empty = Array1::<f64>::zeros(0);

    assert_eq!(relative_error(&empty, &empty)?, 0.0);

    assert!(relative_error(&a, &array![1.0, 2.0]).is_err());

    Ok(())
}
