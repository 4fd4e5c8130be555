use crate::math::matrix::Matrix;

/// Multi-class cross-entropy over raw logits.
///
/// The softmax is folded into the loss (log-sum-exp), so the network's
/// output layer stays unactivated. Both the loss and its gradient are
/// averaged over the batch.
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Mean over the batch of `logsumexp(z) - z[label]`.
    ///
    /// `logits` — `batch × n_classes`
    /// `labels` — one class index per row
    pub fn loss(logits: &Matrix, labels: &[u8]) -> f64 {
        assert_eq!(logits.rows, labels.len(), "one label per logit row");
        let total: f64 = (0..logits.rows)
            .map(|i| {
                let row = logits.row(i);
                log_sum_exp(row) - row[labels[i] as usize]
            })
            .sum();
        total / logits.rows as f64
    }

    /// Gradient w.r.t. the logits:
    ///   ∂L/∂z_ij = (softmax(z_i)_j - 1[j == label_i]) / batch
    pub fn derivative(logits: &Matrix, labels: &[u8]) -> Matrix {
        assert_eq!(logits.rows, labels.len(), "one label per logit row");
        let inv_batch = 1.0 / logits.rows as f64;
        let mut grad = Matrix::zeros(logits.rows, logits.cols);
        for i in 0..logits.rows {
            let row = logits.row(i);
            let lse = log_sum_exp(row);
            let out = &mut grad.data[i * logits.cols..(i + 1) * logits.cols];
            for (j, (g, &z)) in out.iter_mut().zip(row).enumerate() {
                let target = if j == labels[i] as usize { 1.0 } else { 0.0 };
                *g = ((z - lse).exp() - target) * inv_batch;
            }
        }
        grad
    }
}

/// Numerically stable `ln(sum(exp(x)))`.
fn log_sum_exp(row: &[f64]) -> f64 {
    let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + row.iter().map(|&x| (x - max).exp()).sum::<f64>().ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_logits_give_ln_classes() {
        let logits = Matrix::zeros(3, 10);
        let loss = CrossEntropyLoss::loss(&logits, &[0, 4, 9]);
        assert!((loss - 10f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn confident_correct_prediction_has_small_loss() {
        let logits = Matrix::from_vec(1, 3, vec![20.0, 0.0, 0.0]);
        assert!(CrossEntropyLoss::loss(&logits, &[0]) < 1e-8);
        assert!(CrossEntropyLoss::loss(&logits, &[1]) > 19.0);
    }

    #[test]
    fn large_logits_do_not_overflow() {
        let logits = Matrix::from_vec(1, 2, vec![1000.0, 999.0]);
        let loss = CrossEntropyLoss::loss(&logits, &[1]);
        // 1000 + ln(1 + e^-1) - 999
        let expected = 1.0 + (1.0 + (-1f64).exp()).ln();
        assert!((loss - expected).abs() < 1e-9);
    }

    #[test]
    fn gradient_rows_sum_to_zero_and_match_finite_differences() {
        let logits = Matrix::from_vec(2, 3, vec![0.2, -1.0, 0.5, 1.5, 0.0, -0.3]);
        let labels = [2u8, 0];
        let grad = CrossEntropyLoss::derivative(&logits, &labels);

        for i in 0..2 {
            assert!(grad.row(i).iter().sum::<f64>().abs() < 1e-12);
        }

        let eps = 1e-6;
        for idx in 0..logits.data.len() {
            let mut plus = logits.clone();
            plus.data[idx] += eps;
            let mut minus = logits.clone();
            minus.data[idx] -= eps;
            let numeric = (CrossEntropyLoss::loss(&plus, &labels)
                - CrossEntropyLoss::loss(&minus, &labels))
                / (2.0 * eps);
            assert!((numeric - grad.data[idx]).abs() < 1e-6);
        }
    }
}
