use std::time::Instant;

use rand::Rng;
use tracing::info;

use crate::data::dataset::Dataset;
use crate::data::loader::BatchLoader;
use crate::error::{Error, Result};
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::network::network::Network;
use crate::network::spec::NetworkSpec;
use crate::optim::sgd::Sgd;
use crate::train::epoch_stats::{EpochStats, TrainHistory};
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Builds a fresh network from `spec` and trains it for `config.epochs`
/// epochs, evaluating on `test` after each one.
///
/// # Arguments
/// - `spec`   — architecture; parameters are drawn from `rng` first
/// - `train`  — reshuffled from `rng` at the start of every epoch
/// - `test`   — visited in order, never used for updates
/// - `config` — epochs, batch size, learning rate
/// - `rng`    — the run's single source of randomness
///
/// # Errors
/// - `Error::InvalidConfig` for a bad `config`, or a feature or class count
///   that does not match `spec`
/// - `Error::Dataset` if either split is empty
/// - `Error::Diverged` as soon as an epoch's train or test loss is not finite
pub fn train_and_evaluate<R: Rng + ?Sized>(
    spec: &NetworkSpec,
    train: &Dataset,
    test: &Dataset,
    config: &TrainConfig,
    rng: &mut R,
) -> Result<TrainHistory> {
    config.validate()?;
    for (split, data) in [("train", train), ("test", test)] {
        if data.is_empty() {
            return Err(Error::Dataset(format!("{} split is empty", split)));
        }
        if data.n_features() != spec.input_size() {
            return Err(Error::InvalidConfig(format!(
                "{} split has {} features but the network expects {}",
                split,
                data.n_features(),
                spec.input_size()
            )));
        }
        if data.n_classes != spec.output_size() {
            return Err(Error::InvalidConfig(format!(
                "{} split has {} classes but the network has {} outputs",
                split,
                data.n_classes,
                spec.output_size()
            )));
        }
    }

    let mut network = spec.build(rng);
    let optimizer = Sgd::new(config.learning_rate);
    let train_loader = BatchLoader::new(train, config.batch_size, true);
    let test_loader = BatchLoader::new(test, config.batch_size, false);

    let mut history = TrainHistory::default();

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        // ── One full pass over the training data ───────────────────────────
        let train_loss = check_finite(
            train_epoch(&mut network, &train_loader, &optimizer, rng),
            epoch,
            "train",
        )?;

        // ── Evaluation ──────────────────────────────────────────────────────
        let test_loss = check_finite(evaluate(&network, &test_loader, rng), epoch, "test")?;

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            test_loss,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        info!(
            epoch,
            total = config.epochs,
            train_loss,
            test_loss,
            elapsed_ms = stats.elapsed_ms,
            "epoch done"
        );
        history.epochs.push(stats);
    }

    Ok(history)
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// Runs one epoch of mini-batch SGD. Returns the mean of the per-batch
/// mean losses.
pub fn train_epoch<R: Rng + ?Sized>(
    network: &mut Network,
    loader: &BatchLoader<'_>,
    optimizer: &Sgd,
    rng: &mut R,
) -> f64 {
    let mut total_loss = 0.0;
    let mut n_batches = 0usize;

    for batch in loader.epoch(rng) {
        let logits = network.forward(&batch.inputs);
        total_loss += CrossEntropyLoss::loss(&logits, &batch.labels);
        n_batches += 1;

        let grads = network.backward(CrossEntropyLoss::derivative(&logits, &batch.labels));
        for (layer, layer_grads) in network.layers.iter_mut().zip(&grads) {
            optimizer.step(layer, layer_grads);
        }
    }

    total_loss / n_batches.max(1) as f64
}

/// Mean of the per-batch mean losses with no gradient work.
///
/// `network` is borrowed immutably, so no parameter can change.
pub fn evaluate<R: Rng + ?Sized>(network: &Network, loader: &BatchLoader<'_>, rng: &mut R) -> f64 {
    let mut total_loss = 0.0;
    let mut n_batches = 0usize;
    for batch in loader.epoch(rng) {
        total_loss += CrossEntropyLoss::loss(&network.predict(&batch.inputs), &batch.labels);
        n_batches += 1;
    }
    total_loss / n_batches.max(1) as f64
}

fn check_finite(loss: f64, epoch: usize, split: &'static str) -> Result<f64> {
    if loss.is_finite() {
        Ok(loss)
    } else {
        Err(Error::Diverged { epoch, split })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn toy(seed: u64) -> (Dataset, Dataset) {
        let mut rng = StdRng::seed_from_u64(seed);
        let train = Dataset::synthetic(64, 8, 4, &mut rng);
        let test = Dataset::synthetic(32, 8, 4, &mut rng);
        (train, test)
    }

    #[test]
    fn history_has_one_entry_per_epoch() {
        let (train, test) = toy(1);
        let spec = NetworkSpec::mlp(8, &[16, 16, 4], 4).unwrap();
        let config = TrainConfig::new(3, 16, 0.05);
        let history = train_and_evaluate(&spec, &train, &test, &config, &mut StdRng::seed_from_u64(2)).unwrap();

        assert_eq!(history.epochs.len(), 3);
        assert_eq!(history.train_losses().len(), 3);
        assert_eq!(history.test_losses().len(), 3);
        assert_eq!(history.epochs.iter().map(|e| e.epoch).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(history.epochs.iter().all(|e| e.train_loss > 0.0 && e.test_loss > 0.0));
    }

    #[test]
    fn training_reduces_loss_on_separable_data() {
        let (train, test) = toy(3);
        let spec = NetworkSpec::mlp(8, &[32], 4).unwrap();
        let config = TrainConfig::new(20, 8, 0.1);
        let history = train_and_evaluate(&spec, &train, &test, &config, &mut StdRng::seed_from_u64(4)).unwrap();

        let losses = history.train_losses();
        assert!(losses[losses.len() - 1] < losses[0] * 0.5);
    }

    #[test]
    fn evaluation_does_not_touch_parameters() {
        let (train, test) = toy(5);
        let spec = NetworkSpec::mlp(8, &[8], 4).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let mut network = spec.build(&mut rng);

        let train_loader = BatchLoader::new(&train, 16, true);
        train_epoch(&mut network, &train_loader, &Sgd::new(0.1), &mut rng);

        let before = network.parameters();
        let loss = evaluate(&network, &BatchLoader::new(&test, 16, false), &mut rng);
        assert!(loss.is_finite());
        assert_eq!(network.parameters(), before);
    }

    #[test]
    fn same_seed_gives_identical_histories() {
        let (train, test) = toy(7);
        let spec = NetworkSpec::mlp(8, &[12, 12, 4], 4).unwrap();
        let config = TrainConfig::new(2, 10, 0.05);
        let a = train_and_evaluate(&spec, &train, &test, &config, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = train_and_evaluate(&spec, &train, &test, &config, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a.train_losses(), b.train_losses());
        assert_eq!(a.test_losses(), b.test_losses());
    }

    #[test]
    fn non_finite_loss_is_reported_as_divergence() {
        assert_eq!(check_finite(2.3, 1, "train").unwrap(), 2.3);
        let err = check_finite(f64::NAN, 4, "test").unwrap_err();
        assert!(matches!(err, Error::Diverged { epoch: 4, split: "test" }));
        assert!(check_finite(f64::INFINITY, 1, "train").is_err());
    }

    #[test]
    fn feature_mismatch_is_rejected_before_training() {
        let (train, test) = toy(10);
        let spec = NetworkSpec::mlp(9, &[4], 4).unwrap();
        let err = train_and_evaluate(&spec, &train, &test, &TrainConfig::default(), &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn class_count_mismatch_is_rejected_before_training() {
        let (train, test) = toy(11);
        let spec = NetworkSpec::mlp(8, &[4], 2).unwrap();
        let err = train_and_evaluate(&spec, &train, &test, &TrainConfig::default(), &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let spec = NetworkSpec::mlp(8, &[4], 4).unwrap();
        let mut rng = StdRng::seed_from_u64(12);
        let wider_test = Dataset::synthetic(16, 8, 10, &mut rng);
        let err = train_and_evaluate(&spec, &train, &wider_test, &TrainConfig::default(), &mut rng).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn exploding_activations_stop_training_with_divergence() {
        let (mut train, test) = toy(13);
        for row in &mut train.inputs {
            row.iter_mut().for_each(|x| *x *= 1e200);
        }
        let spec = NetworkSpec::mlp(8, &[8, 8], 4).unwrap();
        let config = TrainConfig::new(3, 8, 0.1);
        let err = train_and_evaluate(&spec, &train, &test, &config, &mut StdRng::seed_from_u64(14)).unwrap_err();
        assert!(matches!(err, Error::Diverged { epoch: 1, split: "train" }), "{:?}", err);
    }
}
