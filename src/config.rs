use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::data::mnist::Normalization;
use crate::error::{Error, Result};
use crate::report::chart::ChartOptions;
use crate::sweep::Sweep;
use crate::train::train_config::TrainConfig;

/// File looked up in the working directory by [`ExperimentConfig::load_or_default`].
pub const CONFIG_FILE: &str = "double_descent.json";

/// Every knob of the experiment. `Default` is the reference run.
///
/// Any field may be omitted from the JSON file; missing fields keep their
/// default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Seeds the single RNG used for initialization and shuffling.
    pub seed: u64,
    /// Directory holding the MNIST IDX files (plain or `.gz`).
    pub data_dir: PathBuf,
    /// Widths of the first two hidden layers, swept in order.
    pub widths: Vec<usize>,
    /// Width of the third hidden layer, fixed across the sweep.
    pub tail_width: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub normalization: Normalization,
    pub chart_path: PathBuf,
    pub results_path: PathBuf,
    /// Log2 x axis on the chart.
    pub log_x: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            seed: 123,
            data_dir: PathBuf::from("data"),
            widths: vec![16, 32, 64, 128, 256, 512, 1024, 2048],
            tail_width: 16,
            epochs: 10,
            batch_size: 64,
            learning_rate: 0.01,
            normalization: Normalization::default(),
            chart_path: PathBuf::from("double_descent_plot.png"),
            results_path: PathBuf::from("double_descent_results.json"),
            log_x: false,
        }
    }
}

impl ExperimentConfig {
    pub fn load_json(path: &Path) -> Result<ExperimentConfig> {
        let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
        let config: ExperimentConfig = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| Error::io(path, e))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    /// Reads `path` when it exists, otherwise returns the reference run.
    pub fn load_or_default(path: &Path) -> Result<ExperimentConfig> {
        if path.exists() {
            info!(path = %path.display(), "loading configuration");
            ExperimentConfig::load_json(path)
        } else {
            Ok(ExperimentConfig::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.widths.is_empty() {
            return Err(Error::InvalidConfig("widths must not be empty".into()));
        }
        if self.widths.contains(&0) || self.tail_width == 0 {
            return Err(Error::InvalidConfig("layer widths must be positive".into()));
        }
        if !(self.normalization.std.is_finite() && self.normalization.std > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "normalization std must be positive, got {}",
                self.normalization.std
            )));
        }
        if !self.normalization.mean.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "normalization mean must be finite, got {}",
                self.normalization.mean
            )));
        }
        self.train_config().validate()
    }

    pub fn train_config(&self) -> TrainConfig {
        TrainConfig::new(self.epochs, self.batch_size, self.learning_rate)
    }

    pub fn sweep(&self) -> Sweep {
        Sweep::new(self.widths.clone(), self.tail_width)
    }

    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions { log_x: self.log_x, ..ChartOptions::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_reference_run() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.seed, 123);
        assert_eq!(config.widths, vec![16, 32, 64, 128, 256, 512, 1024, 2048]);
        assert_eq!(config.train_config(), TrainConfig::new(10, 64, 0.01));
        assert_eq!(config.sweep().tail_width, 16);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "widths": [4, 8], "epochs": 2 }"#).unwrap();

        let config = ExperimentConfig::load_or_default(&path).unwrap();
        assert_eq!(config.widths, vec![4, 8]);
        assert_eq!(config.epochs, 2);
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.seed, 123);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExperimentConfig::load_or_default(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, ExperimentConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad = [
            ExperimentConfig { widths: vec![], ..Default::default() },
            ExperimentConfig { widths: vec![16, 0], ..Default::default() },
            ExperimentConfig { epochs: 0, ..Default::default() },
            ExperimentConfig { batch_size: 0, ..Default::default() },
            ExperimentConfig { learning_rate: -0.1, ..Default::default() },
            ExperimentConfig { normalization: Normalization { mean: 0.5, std: 0.0 }, ..Default::default() },
            ExperimentConfig { normalization: Normalization { mean: f64::NAN, std: 0.5 }, ..Default::default() },
            ExperimentConfig { normalization: Normalization { mean: f64::INFINITY, std: 0.5 }, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))), "{:?}", config);
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = ExperimentConfig { seed: 7, log_x: true, ..Default::default() };
        config.save_json(&path).unwrap();
        assert_eq!(ExperimentConfig::load_json(&path).unwrap(), config);
    }
}
