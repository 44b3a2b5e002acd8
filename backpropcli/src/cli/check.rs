use clap::Args;
use colorful::Colorful;

use ndarray::{Array, Dimension};

use backproplib::prelude::*;

use crate::dataset::uniform_array;

#[derive(Args)]
pub struct CheckCli {
    #[arg(long, default_value_t = 4)]
    /// Amount of examples in the random batch.
    batch: usize,

    #[arg(long, default_value_t = 5)]
    /// Amount of attributes of each example (affine layer inputs).
    inputs: usize,

    #[arg(long, default_value_t = 3)]
    /// Amount of affine layer outputs.
    outputs: usize,

    #[arg(long, default_value_t = 0)]
    /// Seed of the random values generator.
    seed: u64,

    #[arg(long, default_value_t = 1e-5)]
    /// Step used for the finite differences.
    step: f64,

    #[arg(long, default_value_t = 1e-5)]
    /// Maximal allowed relative error between analytic and numerical gradients.
    tolerance: f64
}

/// Result of comparing one analytic gradient with its numerical estimation.
pub struct GradientCheck {
    pub name: &'static str,
    pub error: f64
}

impl GradientCheck {
    #[inline]
    pub fn compare<D: Dimension>(name: &'static str, analytic: &Array<f64, D>, numerical: &Array<f64, D>) -> anyhow::Result<Self> {
        Ok(Self {
            name,
            error: relative_error(analytic, numerical)?
        })
    }
}

impl CheckCli {
    /// Run backward passes of every layer on random values and
    /// compare them with numerical gradients.
    pub fn run(&self) -> anyhow::Result<Vec<GradientCheck>> {
        anyhow::ensure!(self.batch > 0 && self.inputs > 0 && self.outputs > 0, "batch, inputs and outputs must be positive");
        anyhow::ensure!(self.step > 0.0, "finite differences step must be positive");

        let mut rng = fastrand::Rng::with_seed(self.seed);
        let h = self.step;

        let mut checks = Vec::with_capacity(5);

        // Affine layer.
        let x = uniform_array(&mut rng, (self.batch, self.inputs), -1.0, 1.0);
        let w = uniform_array(&mut rng, (self.inputs, self.outputs), -1.0, 1.0);
        let b = uniform_array(&mut rng, self.outputs, -1.0, 1.0);
        let dout = uniform_array(&mut rng, (self.batch, self.outputs), -1.0, 1.0);

        let (_, cache) = affine_forward(&x, &w, &b)?;
        let grads = affine_backward(&dout, cache)?;

        tracing::debug!(x = ?x.dim(), w = ?w.dim(), "checking affine layer");

        checks.push(GradientCheck::compare("affine dx", &grads.dx, &numerical_gradient_array(|x| Ok(affine_forward(x, &w, &b)?.0), &x, &dout, h)?)?);
        checks.push(GradientCheck::compare("affine dw", &grads.dw, &numerical_gradient_array(|w| Ok(affine_forward(&x, w, &b)?.0), &w, &dout, h)?)?);
        checks.push(GradientCheck::compare("affine db", &grads.db, &numerical_gradient_array(|b| Ok(affine_forward(&x, &w, b)?.0), &b, &dout, h)?)?);

        // ReLU layer. Values too close to zero would make finite
        // differences step over the kink, so they're moved away from it.
        let x = uniform_array(&mut rng, (self.batch, self.outputs), -1.0, 1.0)
            .mapv(|x| if x.abs() < 10.0 * h { x + 20.0 * h } else { x });

        let (_, cache) = relu_forward(&x);
        let dx = relu_backward(&dout, cache)?;

        tracing::debug!(x = ?x.dim(), "checking relu layer");

        checks.push(GradientCheck::compare("relu dx", &dx, &numerical_gradient_array(|x| Ok(relu_forward(x).0), &x, &dout, h)?)?);

        // L2 loss.
        let x = uniform_array(&mut rng, self.batch, -1.0, 1.0);
        let y = uniform_array(&mut rng, self.batch, -1.0, 1.0);

        let (loss, dx) = l2_loss(&x, &y)?;

        tracing::debug!(loss, "checking l2 loss");

        checks.push(GradientCheck::compare("l2 dx", &dx, &numerical_gradient(|x| Ok(l2_loss(x, &y)?.0), &x, h)?)?);

        Ok(checks)
    }

    pub fn execute(self) -> anyhow::Result<()> {
        println!("⏳ Checking gradients on batch of {} examples ({} -> {})...", self.batch, self.inputs, self.outputs);

        let checks = self.run()?;

        let mut failed = 0;

        for check in &checks {
            let line = format!("{:>10}: relative error {:.3e}", check.name, check.error);

            if check.error <= self.tolerance {
                println!("{}", format!("✅ {line}").green());
            } else {
                failed += 1;

                eprintln!("{}", format!("🧯 {line}").red());
            }
        }

        anyhow::ensure!(failed == 0, "{failed} of {} gradient checks exceeded tolerance {:e}", checks.len(), self.tolerance);

        println!("{}", "🚀 All gradients match".green());

        Ok(())
    }
}

#[test]
fn test_gradient_checks_pass() -> anyhow::Result<()> {
    for seed in 0..5 {
        let command = CheckCli {
            batch: 3,
            inputs: 4,
            outputs: 2,
            seed,
            step: 1e-5,
            tolerance: 1e-5
        };

        let checks = command.run()?;

        assert_eq!(checks.len(), 5);

        for check in checks {
            assert!(check.error < 1e-5, "{} relative error {}", check.name, check.error);
        }
    }

    Ok(())
}

#[test]
fn test_gradient_checks_validate_sizes() {
    let command = CheckCli {
        batch: 0,
        inputs: 4,
        outputs: 2,
        seed: 0,
        step: 1e-5,
        tolerance: 1e-5
    };

    assert!(command.run().is_err());
}
