//! Width sweep: one freshly initialized model per width, trained in order.

use std::path::Path;

use rand::Rng;
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::data::dataset::Dataset;
use crate::error::{Error, Result};
use crate::network::spec::NetworkSpec;
use crate::train::loop_fn::train_and_evaluate;
use crate::train::train_config::TrainConfig;

/// Final-epoch losses of one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub train_loss: f64,
    pub test_loss: f64,
}

/// Final train and test loss for every swept width, indexed like `widths`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub widths: Vec<usize>,
    pub train_losses: Vec<f64>,
    pub test_losses: Vec<f64>,
}

impl SweepResult {
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| Error::io(path, e))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<SweepResult> {
        let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

/// Hidden widths trained for one sweep point: `[width, width, tail]`.
pub fn hidden_config(width: usize, tail: usize) -> Vec<usize> {
    vec![width, width, tail]
}

/// The list of widths plus the fixed tail layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sweep {
    pub widths: Vec<usize>,
    pub tail_width: usize,
}

impl Sweep {
    pub fn new(widths: Vec<usize>, tail_width: usize) -> Sweep {
        Sweep { widths, tail_width }
    }

    /// Calls `train_fn` once per width, in order, with that width's hidden
    /// configuration. The first error aborts the sweep.
    pub fn run_with<F>(&self, mut train_fn: F) -> Result<SweepResult>
    where
        F: FnMut(&[usize]) -> Result<RunResult>,
    {
        let mut result = SweepResult {
            widths: Vec::with_capacity(self.widths.len()),
            train_losses: Vec::with_capacity(self.widths.len()),
            test_losses: Vec::with_capacity(self.widths.len()),
        };

        for (i, &width) in self.widths.iter().enumerate() {
            let hidden = hidden_config(width, self.tail_width);
            info!(width, step = i + 1, of = self.widths.len(), ?hidden, "training");
            let run = train_fn(&hidden)?;
            info!(
                width,
                train_loss = run.train_loss,
                test_loss = run.test_loss,
                "width done"
            );
            result.widths.push(width);
            result.train_losses.push(run.train_loss);
            result.test_losses.push(run.test_loss);
        }

        Ok(result)
    }
}

/// Runs the full sweep with the real trainer.
///
/// All widths draw from the same `rng` in order, so results are
/// reproducible only for the same seed and the same width order.
pub fn run_sweep<R: Rng + ?Sized>(
    sweep: &Sweep,
    train: &Dataset,
    test: &Dataset,
    config: &TrainConfig,
    rng: &mut R,
) -> Result<SweepResult> {
    let input_size = train.n_features();
    let n_classes = train.n_classes;

    sweep.run_with(|hidden| {
        let spec = NetworkSpec::mlp(input_size, hidden, n_classes)?;
        let history = train_and_evaluate(&spec, train, test, config, &mut *rng)?;
        let (train_loss, test_loss) = history
            .final_losses()
            .ok_or_else(|| Error::InvalidConfig("no epoch was run".into()))?;
        Ok(RunResult { train_loss, test_loss })
    })
}
