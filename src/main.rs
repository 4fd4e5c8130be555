//! Double descent width sweep on MNIST.
//!
//! Trains `784 → w → w → 16 → 10` ReLU networks for every width in the
//! configuration, then charts final train/test loss against width and marks
//! the first local minimum of the test curve.
//!
//! Run with:
//!   cargo run --release
//!
//! The MNIST IDX files (plain or `.gz`) must be present in `data/`.
//! Settings can be overridden by a `double_descent.json` in the working
//! directory.

use std::path::Path;

use anyhow::{Context, Result};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, warn};

use double_descent::{
    config::CONFIG_FILE, overparameterized_onset, run_sweep, save_chart, ExperimentConfig, Mnist,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("double_descent=info")),
        )
        .init();

    let config = ExperimentConfig::load_or_default(Path::new(CONFIG_FILE))
        .context("reading configuration")?;
    info!(seed = config.seed, widths = ?config.widths, epochs = config.epochs, "starting sweep");

    let mut rng = StdRng::seed_from_u64(config.seed);

    let mnist = Mnist::load(&config.data_dir, config.normalization)
        .with_context(|| format!("loading MNIST from {}", config.data_dir.display()))?;
    info!(train = mnist.train.len(), test = mnist.test.len(), "dataset ready");

    let result = run_sweep(&config.sweep(), &mnist.train, &mnist.test, &config.train_config(), &mut rng)
        .context("running width sweep")?;

    for ((width, train), test) in result.widths.iter().zip(&result.train_losses).zip(&result.test_losses) {
        info!(width, train_loss = train, test_loss = test, "final");
    }

    let onset = overparameterized_onset(&result.test_losses);
    match onset {
        Some(i) => info!(index = i, width = result.widths[i], "overparameterized onset"),
        None => warn!("test loss has no local minimum followed by a rise; chart has no onset marker"),
    }

    result
        .save_json(&config.results_path)
        .with_context(|| format!("writing {}", config.results_path.display()))?;
    save_chart(&config.chart_path, &result, onset, &config.chart_options())
        .with_context(|| format!("writing {}", config.chart_path.display()))?;

    Ok(())
}
