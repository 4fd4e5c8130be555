use rand::{seq::SliceRandom, Rng};

use crate::data::dataset::Dataset;
use crate::math::matrix::Matrix;

/// One mini-batch: a `batch × features` matrix and its labels.
#[derive(Debug, Clone)]
pub struct Batch {
    pub inputs: Matrix,
    pub labels: Vec<u8>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Splits a dataset into fixed-size batches, one epoch at a time.
///
/// The last batch of an epoch holds the remainder and may be shorter.
pub struct BatchLoader<'a> {
    dataset: &'a Dataset,
    batch_size: usize,
    shuffle: bool,
}

impl<'a> BatchLoader<'a> {
    /// # Panics
    /// Panics if `batch_size == 0`.
    pub fn new(dataset: &'a Dataset, batch_size: usize, shuffle: bool) -> BatchLoader<'a> {
        assert!(batch_size > 0, "batch_size must be at least 1");
        BatchLoader { dataset, batch_size, shuffle }
    }

    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Iterator over one epoch's batches.
    ///
    /// With `shuffle` set, a fresh permutation is drawn from `rng` on every
    /// call; otherwise samples come in dataset order and `rng` is not touched.
    pub fn epoch<R: Rng + ?Sized>(&self, rng: &mut R) -> Batches<'a> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            order.shuffle(rng);
        }
        Batches {
            dataset: self.dataset,
            order,
            batch_size: self.batch_size,
            cursor: 0,
        }
    }
}

pub struct Batches<'a> {
    dataset: &'a Dataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let indices = &self.order[self.cursor..end];
        self.cursor = end;

        let rows: Vec<&[f64]> = indices.iter().map(|&i| self.dataset.inputs[i].as_slice()).collect();
        Some(Batch {
            inputs: Matrix::from_rows(&rows),
            labels: indices.iter().map(|&i| self.dataset.labels[i]).collect(),
        })
    }
}
