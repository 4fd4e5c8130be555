use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Fully connected layer: `a = σ(x · W + b)`.
///
/// `weights` is `input_size × size` and `biases` is `1 × size`; inputs are
/// batches with one sample per row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub size: usize,
    pub input_size: usize,
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: ActivationFunction,
    #[serde(skip)]
    input: Matrix,         // batch fed to the last training forward pass
    #[serde(skip)]
    pre_neurons: Matrix,   // pre-activation values (z = xW + b) needed for correct derivative
}

/// Gradients of the batch loss with respect to one layer's parameters.
#[derive(Debug, Clone)]
pub struct LayerGradients {
    pub weights: Matrix,
    pub biases: Matrix,
}

impl Layer {
    /// Creates a layer with weights and biases drawn from
    /// `U(-1/sqrt(input_size), 1/sqrt(input_size))`, weights first.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        let bound = 1.0 / (input_size as f64).sqrt();
        let weights = Matrix::uniform(input_size, size, bound, rng);
        let biases = Matrix::uniform(1, size, bound, rng);

        Layer {
            size,
            input_size,
            weights,
            biases,
            activator: activation,
            input: Matrix::default(),
            pre_neurons: Matrix::default(),
        }
    }

    /// Training-mode forward pass; remembers the input and `z` for backprop.
    pub fn feed_from(&mut self, input: &Matrix) -> Matrix {
        let z = (input * &self.weights).add_row(&self.biases);
        let a = z.map(|x| self.activator.function(x));
        self.input = input.clone();
        self.pre_neurons = z;
        a
    }

    /// Inference-only forward pass. Leaves the layer untouched.
    pub fn evaluate(&self, input: &Matrix) -> Matrix {
        (input * &self.weights)
            .add_row(&self.biases)
            .map(|x| self.activator.function(x))
    }

    /// Backpropagates through this layer.
    ///
    /// `upstream` is ∂L/∂a for this layer's output. Returns the parameter
    /// gradients and ∂L/∂x for the layer's input, which becomes the
    /// upstream delta of the previous layer.
    ///
    /// # Panics
    /// Panics if called before `feed_from`.
    pub fn compute_gradients(&self, upstream: &Matrix) -> (LayerGradients, Matrix) {
        assert_eq!(
            self.pre_neurons.rows, upstream.rows,
            "compute_gradients called without a matching feed_from"
        );
        // δ = upstream ⊙ σ'(z)
        let act_derivative = self.pre_neurons.map(|x| self.activator.derivative(x));
        let delta = upstream.hadamard(&act_derivative);

        let grads = LayerGradients {
            weights: self.input.transpose_mul(&delta),
            biases: delta.sum_rows(),
        };
        let input_delta = delta.mul_transpose(&self.weights);

        (grads, input_delta)
    }

    /// Applies pre-computed gradients scaled by lr.
    pub fn apply_gradients(&mut self, grads: &LayerGradients, lr: f64) {
        self.weights.sub_scaled(&grads.weights, lr);
        self.biases.sub_scaled(&grads.biases, lr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn fixed_layer(activation: ActivationFunction) -> Layer {
        let mut rng = StdRng::seed_from_u64(1);
        let mut layer = Layer::new(2, 2, activation, &mut rng);
        layer.weights = Matrix::from_vec(2, 2, vec![1.0, -1.0, 2.0, 0.5]);
        layer.biases = Matrix::from_vec(1, 2, vec![0.0, -1.0]);
        layer
    }

    #[test]
    fn init_stays_within_fan_in_bound() {
        let mut rng = StdRng::seed_from_u64(9);
        let layer = Layer::new(100, 8, ActivationFunction::ReLU, &mut rng);
        assert_eq!((layer.weights.rows, layer.weights.cols), (100, 8));
        assert_eq!((layer.biases.rows, layer.biases.cols), (1, 8));
        assert!(layer.weights.data.iter().chain(&layer.biases.data).all(|w| w.abs() <= 0.1));
    }

    #[test]
    fn feed_from_and_evaluate_agree() {
        let mut layer = fixed_layer(ActivationFunction::ReLU);
        let x = Matrix::from_vec(2, 2, vec![1.0, 1.0, -1.0, 0.0]);
        let trained = layer.feed_from(&x);
        assert_eq!(trained, layer.evaluate(&x));
        // Row 0: z = [3, -1.5] -> [3, 0]; row 1: z = [-1, 0] -> [0, 0].
        assert_eq!(trained.data, vec![3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut layer = fixed_layer(ActivationFunction::Identity);
        let x = Matrix::from_vec(1, 2, vec![0.3, -0.7]);
        // L = sum(a), so upstream delta is all ones.
        layer.feed_from(&x);
        let (grads, _) = layer.compute_gradients(&Matrix::from_vec(1, 2, vec![1.0, 1.0]));

        let eps = 1e-6;
        for idx in 0..4 {
            let mut plus = layer.clone();
            plus.weights.data[idx] += eps;
            let mut minus = layer.clone();
            minus.weights.data[idx] -= eps;
            let numeric = (plus.evaluate(&x).data.iter().sum::<f64>()
                - minus.evaluate(&x).data.iter().sum::<f64>())
                / (2.0 * eps);
            assert!((numeric - grads.weights.data[idx]).abs() < 1e-6);
        }
        assert_eq!(grads.biases.data, vec![1.0, 1.0]);
    }
}
