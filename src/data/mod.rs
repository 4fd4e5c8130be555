pub mod dataset;
pub mod idx;
pub mod loader;
pub mod mnist;

pub use dataset::Dataset;
pub use loader::{Batch, BatchLoader};
pub use mnist::{Mnist, Normalization};
