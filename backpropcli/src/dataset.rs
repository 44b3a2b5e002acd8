use ndarray::{Array, Array1, Array2, Dimension, ShapeBuilder};

/// Array of the given shape filled with uniform random values from `[low, high)`.
pub fn uniform_array<D: Dimension>(
    rng: &mut fastrand::Rng,
    shape: impl ShapeBuilder<Dim = D>,
    low: f64,
    high: f64
) -> Array<f64, D> {
    Array::from_shape_simple_fn(shape, || low + rng.f64() * (high - low))
}

#[derive(Debug, Clone, PartialEq)]
/// Regression examples: `inputs` has shape `(N, d)`, `targets` has shape `(N,)`.
pub struct Dataset {
    pub inputs: Array2<f64>,
    pub targets: Array1<f64>
}

impl Dataset {
    /// Generate `samples` examples with `features` attributes from `[-2, 2)`
    /// each, labeled with `y = Σ sin(x_j)`.
    pub fn synthetic(samples: usize, features: usize, rng: &mut fastrand::Rng) -> Self {
        let inputs = uniform_array(rng, (samples, features), -2.0, 2.0);

        let targets = inputs.rows()
            .into_iter()
            .map(|row| row.iter().map(|x| x.sin()).sum())
            .collect();

        Self {
            inputs,
            targets
        }
    }

    #[inline]
    /// Amount of examples in the dataset.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    /// Check if the dataset has no examples.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[test]
fn test_synthetic_dataset() {
    let mut rng = fastrand::Rng::with_seed(5);

    let dataset = Dataset::synthetic(32, 3, &mut rng);

    assert_eq!(dataset.inputs.dim(), (32, 3));
    assert_eq!(dataset.len(), 32);
    assert!(!dataset.is_empty());
    assert!(Dataset::synthetic(0, 3, &mut rng).is_empty());

    assert!(dataset.inputs.iter().all(|x| (-2.0..2.0).contains(x)));

    for (row, target) in dataset.inputs.rows().into_iter().zip(dataset.targets.iter()) {
        let expected = row[0].sin() + row[1].sin() + row[2].sin();

        approx::assert_relative_eq!(*target, expected, max_relative = 1e-12);
    }

    // Same seed gives the same dataset.
    let mut rng = fastrand::Rng::with_seed(5);

    assert_eq!(Dataset::synthetic(32, 3, &mut rng), dataset);
}
