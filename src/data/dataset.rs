use rand::Rng;

use crate::error::{Error, Result};

/// An in-memory labeled split. Inputs are already flattened and normalized.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub inputs: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
    pub n_classes: usize,
}

impl Dataset {
    /// # Errors
    /// `Error::Dataset` if lengths differ, rows are ragged, or a label is out of range.
    pub fn new(inputs: Vec<Vec<f64>>, labels: Vec<u8>, n_classes: usize) -> Result<Dataset> {
        if inputs.len() != labels.len() {
            return Err(Error::Dataset(format!(
                "{} inputs but {} labels",
                inputs.len(),
                labels.len()
            )));
        }
        if let Some(first) = inputs.first() {
            if inputs.iter().any(|row| row.len() != first.len()) {
                return Err(Error::Dataset("inputs have differing lengths".into()));
            }
        }
        if labels.iter().any(|&l| l as usize >= n_classes) {
            return Err(Error::Dataset(format!("label out of range for {} classes", n_classes)));
        }
        Ok(Dataset { inputs, labels, n_classes })
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.inputs.first().map(Vec::len).unwrap_or(0)
    }

    /// Small separable dataset for smoke runs and tests.
    ///
    /// Each class gets a random prototype in `[-1, 1]^n_features`; samples
    /// cycle through the classes and add uniform noise of ±0.25 to their
    /// prototype.
    pub fn synthetic<R: Rng + ?Sized>(
        n_samples: usize,
        n_features: usize,
        n_classes: usize,
        rng: &mut R,
    ) -> Dataset {
        assert!(n_classes > 0 && n_classes <= u8::MAX as usize + 1, "n_classes must fit in a u8 label");

        let prototypes: Vec<Vec<f64>> = (0..n_classes)
            .map(|_| (0..n_features).map(|_| rng.gen_range(-1.0..1.0)).collect())
            .collect();

        let mut inputs = Vec::with_capacity(n_samples);
        let mut labels = Vec::with_capacity(n_samples);
        for i in 0..n_samples {
            let class = i % n_classes;
            let sample = prototypes[class].iter()
                .map(|&p| p + rng.gen_range(-0.25..0.25))
                .collect();
            inputs.push(sample);
            labels.push(class as u8);
        }

        Dataset { inputs, labels, n_classes }
    }
}
