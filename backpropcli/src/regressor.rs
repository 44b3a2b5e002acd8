use ndarray::{Array1, Array2, Axis};

use backproplib::prelude::*;

use crate::dataset::uniform_array;

#[derive(Debug, Clone, PartialEq)]
/// Two-layer regression network: `affine -> relu -> affine`.
///
/// The network owns its parameters and drives forward and backward
/// passes of the library layers by itself, updating the parameters
/// with plain gradient descent.
pub struct Regressor {
    /// Hidden layer weights, shape `(d, H)`.
    pub w1: Array2<f64>,

    /// Hidden layer biases, shape `(H,)`.
    pub b1: Array1<f64>,

    /// Output layer weights, shape `(H, 1)`.
    pub w2: Array2<f64>,

    /// Output layer biases, shape `(1,)`.
    pub b2: Array1<f64>
}

impl Regressor {
    /// Create network with uniformly random weights from
    /// `±sqrt(6 / (fan_in + fan_out))` and zero biases.
    pub fn random(inputs: usize, hidden: usize, rng: &mut fastrand::Rng) -> Self {
        let limit = |fan_in: usize, fan_out: usize| (6.0 / (fan_in + fan_out) as f64).sqrt();

        let l1 = limit(inputs, hidden);
        let l2 = limit(hidden, 1);

        Self {
            w1: uniform_array(rng, (inputs, hidden), -l1, l1),
            b1: Array1::zeros(hidden),
            w2: uniform_array(rng, (hidden, 1), -l2, l2),
            b2: Array1::zeros(1)
        }
    }

    #[inline]
    /// Amount of trainable parameters.
    pub fn params(&self) -> usize {
        self.w1.len() + self.b1.len() + self.w2.len() + self.b2.len()
    }

    /// Predict target values for the given inputs of shape `(N, d)`.
    pub fn predict(&self, inputs: &Array2<f64>) -> anyhow::Result<Array1<f64>> {
        let (hidden, _) = affine_forward(inputs, &self.w1, &self.b1)?;
        let (activated, _) = relu_forward(&hidden);
        let (scores, _) = affine_forward(&activated, &self.w2, &self.b2)?;

        Ok(scores.index_axis_move(Axis(1), 0))
    }

    /// Calculate loss of the network on given examples.
    pub fn loss(&self, inputs: &Array2<f64>, targets: &Array1<f64>) -> anyhow::Result<f64> {
        let (loss, _) = l2_loss(&self.predict(inputs)?, targets)?;

        Ok(loss)
    }

    /// Perform one gradient descent step on the given batch and return
    /// the loss value calculated before the parameters update.
    pub fn step(&mut self, inputs: &Array2<f64>, targets: &Array1<f64>, learn_rate: f64) -> anyhow::Result<f64> {
        // Forward pass.
        let (hidden, affine_1) = affine_forward(inputs, &self.w1, &self.b1)?;
        let (activated, activation) = relu_forward(&hidden);
        let (scores, affine_2) = affine_forward(&activated, &self.w2, &self.b2)?;

        let (loss, dscores) = l2_loss(&scores.column(0), targets)?;

        // Backward pass in reverse order.
        let output_grads = affine_backward(&dscores.insert_axis(Axis(1)), affine_2)?;
        let dhidden = relu_backward(&output_grads.dx, activation)?;
        let hidden_grads = affine_backward(&dhidden, affine_1)?;

        // Caches are consumed, so parameters can be updated now.
        self.w1.scaled_add(-learn_rate, &hidden_grads.dw);
        self.b1.scaled_add(-learn_rate, &hidden_grads.db);
        self.w2.scaled_add(-learn_rate, &output_grads.dw);
        self.b2.scaled_add(-learn_rate, &output_grads.db);

        Ok(loss)
    }
}

#[test]
fn test_regressor_shapes() -> anyhow::Result<()> {
    let mut rng = fastrand::Rng::with_seed(1);

    let model = Regressor::random(3, 8, &mut rng);

    assert_eq!(model.params(), 3 * 8 + 8 + 8 + 1);

    let inputs = uniform_array(&mut rng, (5, 3), -1.0, 1.0);

    assert_eq!(model.predict(&inputs)?.dim(), 5);

    // Wrong amount of features is reported, not panicked on.
    let inputs = uniform_array(&mut rng, (5, 4), -1.0, 1.0);

    assert!(model.predict(&inputs).is_err());

    Ok(())
}

#[cfg(test)]
/// Compare the parameter change made by one `step` with learn rate 1
/// against the numerical gradient of the loss for a single parameter.
fn step_error<D: ndarray::Dimension>(
    model: &Regressor,
    stepped: &Regressor,
    inputs: &Array2<f64>,
    targets: &Array1<f64>,
    param: fn(&mut Regressor) -> &mut ndarray::Array<f64, D>
) -> anyhow::Result<f64> {
    let mut model = model.clone();
    let mut stepped = stepped.clone();

    let analytic = &*param(&mut model) - &*param(&mut stepped);
    let value = param(&mut model).clone();

    let numerical = numerical_gradient(|value| {
        let mut model = model.clone();

        *param(&mut model) = value.clone();

        model.loss(inputs, targets)
            .map_err(|_| incompatible_shape())
    }, &value, 1e-5)?;

    Ok(relative_error(&analytic, &numerical)?)
}

#[test]
fn test_regressor_step_matches_numerical_gradient() -> anyhow::Result<()> {
    let mut rng = fastrand::Rng::with_seed(2);

    let model = Regressor::random(2, 4, &mut rng);

    let inputs = uniform_array(&mut rng, (6, 2), -1.0, 1.0);
    let targets = uniform_array(&mut rng, 6, -1.0, 1.0);

    // One step with learn rate 1 moves every parameter by its exact gradient.
    let mut stepped = model.clone();

    stepped.step(&inputs, &targets, 1.0)?;

    let errors = [
        ("w1", step_error(&model, &stepped, &inputs, &targets, |model| &mut model.w1)?),
        ("b1", step_error(&model, &stepped, &inputs, &targets, |model| &mut model.b1)?),
        ("w2", step_error(&model, &stepped, &inputs, &targets, |model| &mut model.w2)?),
        ("b2", step_error(&model, &stepped, &inputs, &targets, |model| &mut model.b2)?)
    ];

    for (name, error) in errors {
        assert!(error < 1e-5, "{name} relative error {error}");
    }

    Ok(())
}

#[test]
/// Train the network on `y = sin(x1) + sin(x2)` and check
/// that gradient descent actually fits the data.
fn test_regressor_training_reduces_loss() -> anyhow::Result<()> {
    let mut rng = fastrand::Rng::with_seed(3);

    let dataset = crate::dataset::Dataset::synthetic(64, 2, &mut rng);

    let mut model = Regressor::random(2, 16, &mut rng);

    let initial_loss = model.loss(&dataset.inputs, &dataset.targets)?;

    for _ in 0..500 {
        model.step(&dataset.inputs, &dataset.targets, 0.1)?;
    }

    let final_loss = model.loss(&dataset.inputs, &dataset.targets)?;

    assert!(final_loss < initial_loss * 0.5);

    Ok(())
}
