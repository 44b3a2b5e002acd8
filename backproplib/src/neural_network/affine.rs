use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, ShapeError};

use super::prelude::*;

#[derive(Debug, Clone)]
/// Values remembered by `affine_forward` for the matching `affine_backward` call.
///
/// The cache borrows inputs of the forward pass, so they can't be
/// updated (by an optimizer, for example) until the cache is consumed.
pub struct AffineCache<'a, F: Float> {
    /// Input data, shape `(N, d)`.
    pub x: ArrayView2<'a, F>,

    /// Weights, shape `(d, M)`.
    pub w: ArrayView2<'a, F>,

    /// Biases, shape `(M,)`.
    pub b: ArrayView1<'a, F>
}

#[derive(Debug, Clone, PartialEq)]
/// Gradients of the loss with respect to every input of the affine layer.
pub struct AffineGradients<F: Float> {
    /// Gradient with respect to `x`, shape `(N, d)`.
    pub dx: Array2<F>,

    /// Gradient with respect to `w`, shape `(d, M)`.
    pub dw: Array2<F>,

    /// Gradient with respect to `b`, shape `(M,)`.
    pub db: Array1<F>
}

/// Compute forward pass of an affine (fully-connected) layer: `out = x · w + b`.
///
/// `x` contains `N` examples with `d` attributes each, shape `(N, d)`.
/// Weights `w` have shape `(d, M)` and biases `b` have shape `(M,)`.
/// Returned output has shape `(N, M)`.
///
/// Returns `IncompatibleShape` error if the inner dimensions of `x` and `w`
/// differ, or if `b` can't be broadcast over the rows of `x · w`.
///
/// ```
/// use ndarray::array;
/// use backproplib::prelude::*;
///
/// let x = array![[1.0, 2.0]];
/// let w = array![[1.0], [1.0]];
/// let b = array![0.0];
///
/// let (out, cache) = affine_forward(&x, &w, &b).unwrap();
///
/// assert_eq!(out, array![[3.0]]);
///
/// let grads = affine_backward(&array![[1.0]], cache).unwrap();
///
/// assert_eq!(grads.dx, array![[1.0, 1.0]]);
/// assert_eq!(grads.dw, array![[1.0], [2.0]]);
/// assert_eq!(grads.db, array![1.0]);
/// ```
pub fn affine_forward<'a, F: Float>(
    x: impl Into<ArrayView2<'a, F>>,
    w: impl Into<ArrayView2<'a, F>>,
    b: impl Into<ArrayView1<'a, F>>
) -> Result<(Array2<F>, AffineCache<'a, F>), ShapeError> {
    let x = x.into();
    let w = w.into();
    let b = b.into();

    if x.ncols() != w.nrows() || w.ncols() != b.len() {
        return Err(incompatible_shape());
    }

    let out = x.dot(&w) + &b;

    Ok((out, AffineCache { x, w, b }))
}

/// Compute backward pass of an affine (fully-connected) layer.
///
/// `dout` is the gradient coming from the next layer, shape `(N, M)`.
/// `cache` must be the one returned by the forward call this backward
/// call inverts. It's consumed here.
///
/// - `dx = dout · wᵗ`
/// - `dw = xᵗ · dout`
/// - `db = Σ dout` over the examples axis
pub fn affine_backward<'d, F: Float>(
    dout: impl Into<ArrayView2<'d, F>>,
    cache: AffineCache<'_, F>
) -> Result<AffineGradients<F>, ShapeError> {
    let dout = dout.into();

    let AffineCache { x, w, .. } = cache;

    if dout.nrows() != x.nrows() || dout.ncols() != w.ncols() {
        return Err(incompatible_shape());
    }

    Ok(AffineGradients {
        dx: dout.dot(&w.t()),
        dw: x.t().dot(&dout),
        db: dout.sum_axis(Axis(0))
    })
}

#[test]
fn test_affine_output_shapes() -> Result<(), ShapeError> {
    let mut rng = fastrand::Rng::with_seed(1);

    for (n, d, m) in [(1, 1, 1), (2, 3, 4), (5, 7, 2), (10, 1, 6)] {
        let x = super::gradient_check::random_array(&mut rng, (n, d));
        let w = super::gradient_check::random_array(&mut rng, (d, m));
        let b = super::gradient_check::random_array(&mut rng, m);

        let (out, cache) = affine_forward(&x, &w, &b)?;

        assert_eq!(out.dim(), (n, m));

        let dout = super::gradient_check::random_array(&mut rng, (n, m));
        let grads = affine_backward(&dout, cache)?;

        assert_eq!(grads.dx.dim(), (n, d));
        assert_eq!(grads.dw.dim(), (d, m));
        assert_eq!(grads.db.dim(), m);
    }

    Ok(())
}

#[test]
fn test_affine_forward_values() -> Result<(), ShapeError> {
    use ndarray::array;

    let x = array![[1.0, 2.0], [-1.0, 0.5]];
    let w = array![[1.0, 0.0, 2.0], [0.0, 1.0, -1.0]];
    let b = array![0.5, -0.5, 1.0];

    let (out, cache) = affine_forward(&x, &w, &b)?;

    assert_eq!(out, array![[1.5, 1.5, 1.0], [-0.5, 0.0, -1.5]]);

    // Cache must keep the inputs untouched.
    assert_eq!(cache.x, x);
    assert_eq!(cache.w, w);
    assert_eq!(cache.b, b);

    Ok(())
}

#[test]
fn test_affine_bias_gradient_sums_examples() -> Result<(), ShapeError> {
    use ndarray::array;

    let x = array![[1.0], [2.0], [3.0]];
    let w = array![[1.0, 1.0]];
    let b = array![0.0, 0.0];

    let (_, cache) = affine_forward(&x, &w, &b)?;

    let grads = affine_backward(&array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]], cache)?;

    assert_eq!(grads.db, array![9.0, 12.0]);
    assert_eq!(grads.dw, array![[22.0, 28.0]]);
    assert_eq!(grads.dx, array![[3.0], [7.0], [11.0]]);

    Ok(())
}

#[test]
/// Compare analytic gradients of all three affine inputs
/// with finite differences on random values.
fn test_affine_gradients_match_numerical() -> Result<(), ShapeError> {
    let mut rng = fastrand::Rng::with_seed(42);

    let x = super::gradient_check::random_array(&mut rng, (4, 5));
    let w = super::gradient_check::random_array(&mut rng, (5, 3));
    let b = super::gradient_check::random_array(&mut rng, 3);
    let dout = super::gradient_check::random_array(&mut rng, (4, 3));

    let (_, cache) = affine_forward(&x, &w, &b)?;
    let grads = affine_backward(&dout, cache)?;

    let dx_num = numerical_gradient_array(|x| Ok(affine_forward(x, &w, &b)?.0), &x, &dout, 1e-5)?;
    let dw_num = numerical_gradient_array(|w| Ok(affine_forward(&x, w, &b)?.0), &w, &dout, 1e-5)?;
    let db_num = numerical_gradient_array(|b| Ok(affine_forward(&x, &w, b)?.0), &b, &dout, 1e-5)?;

    assert!(relative_error(&grads.dx, &dx_num)? < 1e-5);
    assert!(relative_error(&grads.dw, &dw_num)? < 1e-5);
    assert!(relative_error(&grads.db, &db_num)? < 1e-5);

    Ok(())
}

#[test]
fn test_affine_shape_mismatch() {
    use ndarray::{array, ErrorKind};

    let x = array![[1.0, 2.0, 3.0]];
    let w = array![[1.0], [1.0]];
    let b = array![0.0];

    let err = affine_forward(&x, &w, &b).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IncompatibleShape);

    // Bias length must match the outputs amount.
    let x = array![[1.0, 2.0]];
    let b = array![0.0, 1.0];

    assert!(affine_forward(&x, &w, &b).is_err());

    // Upstream gradient must have (N, M) shape.
    let b = array![0.0];
    let (_, cache) = affine_forward(&x, &w, &b).unwrap();

    assert!(affine_backward(&array![[1.0, 1.0]], cache.clone()).is_err());
    assert!(affine_backward(&array![[1.0], [1.0]], cache).is_err());
}
