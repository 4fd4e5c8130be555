use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::data::dataset::Dataset;
use crate::data::idx::{parse_idx_pair, read_idx_file, IdxSplit};
use crate::error::{Error, Result};

pub const IMAGE_SIDE: usize = 28;
pub const INPUT_SIZE: usize = IMAGE_SIDE * IMAGE_SIDE;
pub const N_CLASSES: usize = 10;

const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

/// Per-pixel affine normalization: `((p / 255) - mean) / std`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub mean: f64,
    pub std: f64,
}

impl Default for Normalization {
    /// Maps `[0, 255]` onto `[-1, 1]`.
    fn default() -> Self {
        Normalization { mean: 0.5, std: 0.5 }
    }
}

impl Normalization {
    pub fn apply(&self, pixel: u8) -> f64 {
        (pixel as f64 / 255.0 - self.mean) / self.std
    }
}

/// The MNIST train and test splits.
pub struct Mnist {
    pub train: Dataset,
    pub test: Dataset,
}

impl Mnist {
    /// Loads the four MNIST IDX files from `dir`.
    ///
    /// Each file may be stored plain or gzipped (`<name>.gz`). A missing file
    /// is an `Error::Io` naming the uncompressed path.
    pub fn load(dir: &Path, normalization: Normalization) -> Result<Mnist> {
        let train = load_split(dir, TRAIN_IMAGES, TRAIN_LABELS, normalization)?;
        let test = load_split(dir, TEST_IMAGES, TEST_LABELS, normalization)?;
        debug!(train = train.len(), test = test.len(), "loaded MNIST");
        Ok(Mnist { train, test })
    }
}

/// Prefers the plain file, falls back to the gzipped one.
fn locate(dir: &Path, name: &str) -> PathBuf {
    let plain = dir.join(name);
    if plain.exists() {
        return plain;
    }
    let gz = dir.join(format!("{}.gz", name));
    if gz.exists() { gz } else { plain }
}

fn load_split(dir: &Path, images: &str, labels: &str, normalization: Normalization) -> Result<Dataset> {
    let image_bytes = read_idx_file(&locate(dir, images))?;
    let label_bytes = read_idx_file(&locate(dir, labels))?;
    let split = parse_idx_pair(&image_bytes, &label_bytes, N_CLASSES)?;
    if split.rows * split.cols != INPUT_SIZE {
        return Err(Error::Dataset(format!(
            "{}: expected {}×{} images, got {}×{}",
            images, IMAGE_SIDE, IMAGE_SIDE, split.rows, split.cols
        )));
    }
    Ok(normalize(&split, normalization))
}

/// Flattens and normalizes every image of an IDX split.
pub fn normalize(split: &IdxSplit, normalization: Normalization) -> Dataset {
    let inputs = (0..split.len())
        .map(|i| split.image(i).iter().map(|&p| normalization.apply(p)).collect())
        .collect();
    Dataset {
        inputs,
        labels: split.labels.clone(),
        n_classes: N_CLASSES,
    }
}
