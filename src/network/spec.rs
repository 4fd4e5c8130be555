use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::network::network::Network;

/// Describes one layer in a network specification.
///
/// Fields:
/// - `size`       — number of neurons in this layer
/// - `input_size` — number of neurons feeding into this layer (i.e. the output
///                  size of the previous layer, or the raw input dimension for
///                  the first layer)
/// - `activation` — activation function applied after the linear transform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
}

/// Immutable description of a feed-forward classifier, built before any
/// parameter exists.
///
/// `NetworkSpec` can be inspected (see [`NetworkSpec::dims`]) and saved to
/// JSON independently of trained weights; [`NetworkSpec::build`] is the only
/// step that draws random numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Ordered list of layer descriptions (input → output).
    layers: Vec<LayerSpec>,
}

impl NetworkSpec {
    /// Multi-layer perceptron `input -> w1 -> ... -> wn -> n_classes`.
    ///
    /// Every hidden layer is followed by ReLU; the output layer is left
    /// unactivated so it produces logits.
    ///
    /// # Errors
    /// `Error::InvalidConfig` when `hidden_widths` is empty or any size is zero.
    pub fn mlp(input_size: usize, hidden_widths: &[usize], n_classes: usize) -> Result<NetworkSpec> {
        if input_size == 0 || n_classes == 0 {
            return Err(Error::InvalidConfig(format!(
                "input size and class count must be positive (got {} and {})",
                input_size, n_classes
            )));
        }
        if hidden_widths.is_empty() {
            return Err(Error::InvalidConfig("at least one hidden width is required".into()));
        }
        if let Some(pos) = hidden_widths.iter().position(|&w| w == 0) {
            return Err(Error::InvalidConfig(format!("hidden width #{} is zero", pos + 1)));
        }

        let mut layers = Vec::with_capacity(hidden_widths.len() + 1);
        let mut fan_in = input_size;
        for &width in hidden_widths {
            layers.push(LayerSpec {
                size: width,
                input_size: fan_in,
                activation: ActivationFunction::ReLU,
            });
            fan_in = width;
        }
        layers.push(LayerSpec {
            size: n_classes,
            input_size: fan_in,
            activation: ActivationFunction::Identity,
        });

        Ok(NetworkSpec { layers })
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    /// `(input_size, size)` of every linear layer, input to output.
    pub fn dims(&self) -> Vec<(usize, usize)> {
        self.layers.iter().map(|l| (l.input_size, l.size)).collect()
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].input_size
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].size
    }

    /// Number of trainable scalars (weights plus biases).
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| (l.input_size + 1) * l.size).sum()
    }

    /// Materializes the parameters, layer by layer, from `rng`.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Network {
        let layers = self.layers.iter()
            .map(|spec| Layer::new(spec.input_size, spec.size, spec.activation, rng))
            .collect();
        Network { layers }
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| Error::io(path, e))?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: &str) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
