use crate::layers::dense::{Layer, LayerGradients};

/// Plain stochastic gradient descent: no momentum, no weight decay.
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }

    /// Applies one SGD weight update to a layer given its pre-computed gradients.
    pub fn step(&self, layer: &mut Layer, grads: &LayerGradients) {
        layer.apply_gradients(grads, self.learning_rate);
    }
}
