use serde::{Serialize, Deserialize};

/// Statistics of one completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean over training batches of the batch-mean loss.
    pub train_loss: f64,
    /// Mean over test batches of the batch-mean loss, computed after the
    /// epoch's last update.
    pub test_loss: f64,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}

/// Everything `train_and_evaluate` records for one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainHistory {
    pub epochs: Vec<EpochStats>,
}

impl TrainHistory {
    pub fn train_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.train_loss).collect()
    }

    pub fn test_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.test_loss).collect()
    }

    /// `(train, test)` loss of the last epoch, if any epoch ran.
    pub fn final_losses(&self) -> Option<(f64, f64)> {
        self.epochs.last().map(|e| (e.train_loss, e.test_loss))
    }
}
