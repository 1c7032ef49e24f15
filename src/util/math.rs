//! Numeric helpers for class scores.

/// Returns `ln(sum(exp(values)))` computed without overflow.
///
/// Returns negative infinity for an empty slice.
pub(crate) fn log_sum_exp(values: &[f32]) -> f32 {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f32 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Applies softmax in place over a single channel vector.
pub(crate) fn softmax_in_place(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }
    let lse = log_sum_exp(values);
    for value in values.iter_mut() {
        *value = (*value - lse).exp();
    }
}

/// Applies softmax independently to every `channels`-sized chunk.
///
/// `values.len()` must be a multiple of `channels`.
pub(crate) fn softmax_channels(values: &mut [f32], channels: usize) {
    if channels == 0 {
        return;
    }
    for cell in values.chunks_exact_mut(channels) {
        softmax_in_place(cell);
    }
}

#[cfg(test)]
mod tests {
    use super::{log_sum_exp, softmax_channels, softmax_in_place};

    #[test]
    fn log_sum_exp_matches_naive_for_small_values() {
        let values = [0.5f32, -1.0, 2.0];
        let naive = values.iter().map(|v| v.exp()).sum::<f32>().ln();
        assert!((log_sum_exp(&values) - naive).abs() < 1e-6);
    }

    #[test]
    fn softmax_survives_large_logits() {
        let mut values = [1000.0f32, 1000.0];
        softmax_in_place(&mut values);
        assert!((values[0] - 0.5).abs() < 1e-6);
        assert!((values[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn softmax_sums_to_one() {
        let mut values = [-3.0f32, 0.25, 7.5, -0.75];
        softmax_in_place(&mut values);
        let sum: f32 = values.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(values.iter().all(|v| *v >= 0.0 && *v <= 1.0));
    }

    #[test]
    fn softmax_channels_normalizes_each_cell() {
        let mut values = [0.0f32, 0.0, 10.0, -10.0, -2.0, 3.0];
        softmax_channels(&mut values, 2);
        for cell in values.chunks_exact(2) {
            assert!((cell[0] + cell[1] - 1.0).abs() < 1e-6);
        }
        assert!((values[0] - 0.5).abs() < 1e-6);
        assert!(values[2] > 0.999);
    }
}
