pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod train;
pub mod sweep;
pub mod report;
pub mod config;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::{Network, NetworkSpec};
pub use loss::cross_entropy::CrossEntropyLoss;
pub use optim::sgd::Sgd;
pub use data::{Dataset, Mnist, Normalization};
pub use train::{train_and_evaluate, TrainConfig, TrainHistory};
pub use sweep::{run_sweep, Sweep, SweepResult};
pub use report::{overparameterized_onset, save_chart, ChartOptions};
pub use config::ExperimentConfig;
pub use error::{Error, Result};
