use crate::error::{Error, Result};
use crate::layers::dense::{Layer, LayerGradients};
use crate::math::matrix::Matrix;
use serde::{Serialize, Deserialize};

/// A materialized feed-forward network. Create one with
/// [`NetworkSpec::build`](crate::network::spec::NetworkSpec::build).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
}

impl Network {
    /// Forward pass; stores activations in each layer for backprop.
    pub fn forward(&mut self, input: &Matrix) -> Matrix {
        let mut layers = self.layers.iter_mut();
        let Some(first) = layers.next() else {
            return input.clone();
        };
        let mut current = first.feed_from(input);
        for layer in layers {
            current = layer.feed_from(&current);
        }
        current
    }

    /// Forward pass without caching. Takes `&self`, so evaluation can never
    /// touch the parameters.
    pub fn predict(&self, input: &Matrix) -> Matrix {
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.evaluate(&current);
        }
        current
    }

    /// Backward pass from ∂L/∂logits of the most recent `forward` call.
    ///
    /// Returns one `LayerGradients` per layer, in layer order.
    pub fn backward(&self, grad_output: Matrix) -> Vec<LayerGradients> {
        let mut grads = Vec::with_capacity(self.layers.len());
        let mut delta = grad_output;
        for layer in self.layers.iter().rev() {
            let (layer_grads, input_delta) = layer.compute_gradients(&delta);
            grads.push(layer_grads);
            delta = input_delta;
        }
        grads.reverse();
        grads
    }

    /// Flattened copy of every weight and bias, layer by layer.
    pub fn parameters(&self) -> Vec<f64> {
        self.layers.iter()
            .flat_map(|l| l.weights.data.iter().chain(&l.biases.data).copied())
            .collect()
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| Error::io(path, e))?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    pub fn load_json(path: &str) -> Result<Network> {
        let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
