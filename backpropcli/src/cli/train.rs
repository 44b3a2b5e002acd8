use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use colorful::Colorful;
use serde::{Serialize, Deserialize};

use crate::dataset::Dataset;
use crate::regressor::Regressor;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Parameters of the training run.
///
/// Fields missing in a config file take their default values.
pub struct TrainConfig {
    /// Amount of synthetic examples.
    pub samples: usize,

    /// Amount of attributes of each example.
    pub features: usize,

    /// Amount of hidden layer units.
    pub hidden: usize,

    /// Amount of full-batch gradient descent steps.
    pub epochs: usize,

    /// Gradient descent step size.
    pub learn_rate: f64,

    /// Seed of the random values generator.
    pub seed: u64,

    /// Print loss every this many epochs.
    pub report_interval: usize
}

impl Default for TrainConfig {
    #[inline]
    fn default() -> Self {
        Self {
            samples: 256,
            features: 2,
            hidden: 32,
            epochs: 1000,
            learn_rate: 0.05,
            seed: 0,
            report_interval: 100
        }
    }
}

impl TrainConfig {
    /// Read config from the JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let config = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path:?}"))?;

        serde_json::from_str(&config)
            .with_context(|| format!("failed to parse config file {path:?}"))
    }

    /// Check that the config values describe a trainable network.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.samples > 0, "samples amount must be positive");
        anyhow::ensure!(self.features > 0, "features amount must be positive");
        anyhow::ensure!(self.hidden > 0, "hidden units amount must be positive");
        anyhow::ensure!(self.report_interval > 0, "report interval must be positive");
        anyhow::ensure!(self.learn_rate > 0.0 && self.learn_rate.is_finite(), "learn rate must be a positive number, got {}", self.learn_rate);

        Ok(())
    }
}

#[derive(Args)]
pub struct TrainCli {
    #[arg(long, short)]
    /// Path to the JSON config file.
    ///
    /// Flags given on the command line override values from this file.
    config: Option<PathBuf>,

    #[arg(long)]
    /// Print the effective config as JSON and exit.
    dump_config: bool,

    #[arg(long)]
    /// Amount of synthetic examples [default: 256].
    samples: Option<usize>,

    #[arg(long)]
    /// Amount of attributes of each example [default: 2].
    features: Option<usize>,

    #[arg(long)]
    /// Amount of hidden layer units [default: 32].
    hidden: Option<usize>,

    #[arg(long)]
    /// Amount of full-batch gradient descent steps [default: 1000].
    epochs: Option<usize>,

    #[arg(long)]
    /// Gradient descent step size [default: 0.05].
    learn_rate: Option<f64>,

    #[arg(long)]
    /// Seed of the random values generator [default: 0].
    seed: Option<u64>,

    #[arg(long)]
    /// Print loss every this many epochs [default: 100].
    report_interval: Option<usize>
}

impl TrainCli {
    /// Build effective config: defaults, then the config file, then flags.
    pub fn config(&self) -> anyhow::Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::load(path)?,
            None => TrainConfig::default()
        };

        if let Some(samples) = self.samples { config.samples = samples; }
        if let Some(features) = self.features { config.features = features; }
        if let Some(hidden) = self.hidden { config.hidden = hidden; }
        if let Some(epochs) = self.epochs { config.epochs = epochs; }
        if let Some(learn_rate) = self.learn_rate { config.learn_rate = learn_rate; }
        if let Some(seed) = self.seed { config.seed = seed; }
        if let Some(report_interval) = self.report_interval { config.report_interval = report_interval; }

        config.validate()?;

        Ok(config)
    }

    pub fn execute(self) -> anyhow::Result<()> {
        let config = self.config()?;

        if self.dump_config {
            println!("{}", serde_json::to_string_pretty(&config)?);

            return Ok(());
        }

        tracing::info!(?config, "starting training");

        let mut rng = fastrand::Rng::with_seed(config.seed);

        println!("⏳ Generating {} examples with {} features...", config.samples, config.features);

        let dataset = Dataset::synthetic(config.samples, config.features, &mut rng);

        let mut model = Regressor::random(config.features, config.hidden, &mut rng);

        println!("{}", "✅ Model created".green());
        println!("              Examples: {}", format!("{}", dataset.len()).yellow());
        println!("          Hidden units: {}", format!("{}", config.hidden).yellow());
        println!("            Parameters: {}", format!("{}", model.params()).yellow());

        let (initial_loss, final_loss) = train(&mut model, &dataset, &config)?;

        println!();
        println!("{}", "🚀 Training finished".green());
        println!("          Initial loss: {}", format!("{initial_loss:.8}").yellow());
        println!("            Final loss: {}", format!("{final_loss:.8}").yellow());

        Ok(())
    }
}

/// Run full-batch gradient descent and return initial and final loss values.
pub fn train(model: &mut Regressor, dataset: &Dataset, config: &TrainConfig) -> anyhow::Result<(f64, f64)> {
    let initial_loss = model.loss(&dataset.inputs, &dataset.targets)?;

    let now = Instant::now();

    for epoch in 0..config.epochs {
        let loss = model.step(&dataset.inputs, &dataset.targets, config.learn_rate)?;

        tracing::debug!(epoch, loss, "gradient descent step");

        anyhow::ensure!(loss.is_finite(), "loss diverged at epoch {epoch}, try lower learn rate");

        if (epoch + 1) % config.report_interval == 0 {
            println!("📖 epoch = {}, loss = {loss:.8}, elapsed = {:.2} seconds", epoch + 1, now.elapsed().as_secs_f64());
        }
    }

    let final_loss = model.loss(&dataset.inputs, &dataset.targets)?;

    Ok((initial_loss, final_loss))
}

#[cfg(test)]
fn flags() -> TrainCli {
    TrainCli {
        config: None,
        dump_config: false,
        samples: None,
        features: None,
        hidden: None,
        epochs: None,
        learn_rate: None,
        seed: None,
        report_interval: None
    }
}

#[test]
fn test_config_defaults() -> anyhow::Result<()> {
    assert_eq!(flags().config()?, TrainConfig::default());

    Ok(())
}

#[test]
fn test_config_partial_json() -> anyhow::Result<()> {
    let config: TrainConfig = serde_json::from_str(r#"{ "hidden": 8, "learn_rate": 0.01 }"#)?;

    assert_eq!(config.hidden, 8);
    assert_eq!(config.learn_rate, 0.01);
    assert_eq!(config.samples, TrainConfig::default().samples);

    Ok(())
}

#[test]
fn test_config_file_and_flags() -> anyhow::Result<()> {
    let path = std::env::temp_dir().join(format!("backprop-config-{}.json", std::process::id()));

    std::fs::write(&path, r#"{ "samples": 16, "epochs": 5, "seed": 7 }"#)?;

    let mut cli = flags();

    cli.config = Some(path.clone());
    cli.epochs = Some(10);

    let config = cli.config();

    std::fs::remove_file(&path)?;

    let config = config?;

    assert_eq!(config.samples, 16);
    assert_eq!(config.seed, 7);

    // Flags take priority over the file.
    assert_eq!(config.epochs, 10);

    Ok(())
}

#[test]
fn test_config_validation() {
    let mut cli = flags();

    cli.hidden = Some(0);

    assert!(cli.config().is_err());

    let mut cli = flags();

    cli.learn_rate = Some(-1.0);

    assert!(cli.config().is_err());

    let mut cli = flags();

    cli.config = Some(PathBuf::from("/nonexistent/backprop.json"));

    assert!(cli.config().is_err());
}

#[test]
fn test_train_reduces_loss() -> anyhow::Result<()> {
    let config = TrainConfig {
        samples: 64,
        hidden: 16,
        epochs: 400,
        learn_rate: 0.1,
        report_interval: 1000,
        ..TrainConfig::default()
    };

    let mut rng = fastrand::Rng::with_seed(config.seed);

    let dataset = Dataset::synthetic(config.samples, config.features, &mut rng);
    let mut model = Regressor::random(config.features, config.hidden, &mut rng);

    let (initial_loss, final_loss) = train(&mut model, &dataset, &config)?;

    assert!(final_loss < initial_loss * 0.5);

    Ok(())
}
