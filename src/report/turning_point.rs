/// Index where the test loss starts rising after a local minimum.
///
/// Returns the smallest interior `i` (`1 <= i <= len - 2`) with
/// `losses[i] < losses[i - 1]` and `losses[i + 1] > losses[i]`, i.e. the
/// first strict local minimum. `None` when the sequence is shorter than
/// three, monotonic, or only dips at a boundary.
pub fn overparameterized_onset(losses: &[f64]) -> Option<usize> {
    losses
        .windows(3)
        .position(|w| w[1] < w[0] && w[2] > w[1])
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_local_minimum_wins() {
        assert_eq!(overparameterized_onset(&[5.0, 3.0, 4.0, 2.0, 6.0]), Some(1));
        assert_eq!(overparameterized_onset(&[5.0, 4.0, 3.0, 4.0, 2.0, 6.0]), Some(2));
    }

    #[test]
    fn monotonic_sequences_have_no_onset() {
        assert_eq!(overparameterized_onset(&[5.0, 4.0, 3.0, 2.0]), None);
        assert_eq!(overparameterized_onset(&[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn boundaries_and_short_inputs_have_no_onset() {
        assert_eq!(overparameterized_onset(&[]), None);
        assert_eq!(overparameterized_onset(&[1.0, 0.5]), None);
        // Minimum at the last element is never followed by a rise.
        assert_eq!(overparameterized_onset(&[3.0, 2.0, 1.0]), None);
        // Minimum at index 0 has no predecessor.
        assert_eq!(overparameterized_onset(&[1.0, 2.0, 3.0, 4.0]), None);
    }

    #[test]
    fn plateaus_are_not_strict_minima() {
        assert_eq!(overparameterized_onset(&[3.0, 2.0, 2.0, 3.0]), None);
        assert_eq!(overparameterized_onset(&[f64::NAN, 1.0, 2.0]), None);
    }
}
