//! Sparse INT8 inference kernel: dequantized logits, stable softmax, and
//! distribution entropy.
//!
//! This module is deliberately infallible. Callers are contractually
//! required to pass a `features` slice of length `num_buckets` and a
//! `weights` slice of length `num_buckets * num_classes`; a debug-only
//! assertion catches violations in development builds, and a release build
//! trusts the contract instead of paying for a bounds check on every dot
//! product.

/// Compute per-class logits from bucket counts against bucket-major int8
/// weights: `logit[c] = bias[c] + scale[c] * dot(features, weights[.., c])`.
///
/// `weights` is bucket-major: `weights[bucket * num_classes + class]`.
pub fn predict_logits(
    features: &[i32],
    weights: &[i8],
    scales: &[f32],
    biases: &[f32],
    num_classes: usize,
) -> Vec<f32> {
    debug_assert_eq!(scales.len(), num_classes);
    debug_assert_eq!(biases.len(), num_classes);
    debug_assert_eq!(weights.len(), features.len() * num_classes);

    let mut dots = vec![0i64; num_classes];
    for (bucket, &count) in features.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let row = &weights[bucket * num_classes..(bucket + 1) * num_classes];
        let count = count as i64;
        for (class, &w) in row.iter().enumerate() {
            dots[class] += count * w as i64;
        }
    }

    (0..num_classes)
        .map(|class| biases[class] + scales[class] * dots[class] as f32)
        .collect()
}

/// Numerically stable softmax: subtract the max logit before exponentiating.
/// If the post-exponentiation sum is non-positive, the pre-softmax logits
/// are returned unchanged rather than dividing by zero.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 {
        return logits.to_vec();
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Full forward pass: features -> logits -> softmax probabilities.
pub fn predict(
    features: &[i32],
    weights: &[i8],
    scales: &[f32],
    biases: &[f32],
    num_classes: usize,
) -> Vec<f32> {
    let logits = predict_logits(features, weights, scales, biases, num_classes);
    softmax(&logits)
}

/// Shannon entropy of a probability distribution, in bits. Zero-probability
/// entries contribute nothing (the `0 * log2(0)` convention).
pub fn entropy(probs: &[f32]) -> f32 {
    probs
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.log2())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_logits_sums_bias_when_features_are_zero() {
        let features = vec![0i32; 4];
        let weights = vec![0i8; 4 * 2];
        let scales = vec![1.0, 1.0];
        let biases = vec![0.5, -0.5];
        let logits = predict_logits(&features, &weights, &scales, &biases, 2);
        assert_eq!(logits, vec![0.5, -0.5]);
    }

    #[test]
    fn predict_logits_matches_hand_computed_dot_product() {
        // 2 buckets, 2 classes, bucket-major weights.
        let features = vec![3i32, 2i32];
        let weights = vec![1i8, -1i8, 2i8, -2i8]; // bucket0: [1,-1], bucket1: [2,-2]
        let scales = vec![1.0, 1.0];
        let biases = vec![0.0, 0.0];
        let logits = predict_logits(&features, &weights, &scales, &biases, 2);
        // class0: 3*1 + 2*2 = 7; class1: 3*-1 + 2*-2 = -7
        assert_eq!(logits, vec![7.0, -7.0]);
    }

    #[test]
    fn softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 1001.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[test]
    fn softmax_favors_larger_logit() {
        let probs = softmax(&[0.0, 5.0]);
        assert!(probs[1] > probs[0]);
    }

    #[test]
    fn entropy_of_certain_distribution_is_zero() {
        let e = entropy(&[1.0, 0.0, 0.0]);
        assert!(e.abs() < 1e-6);
    }

    #[test]
    fn entropy_of_uniform_distribution_is_log2_n() {
        let probs = vec![0.25; 4];
        let e = entropy(&probs);
        assert!((e - 2.0).abs() < 1e-5);
    }

    #[test]
    fn predict_returns_a_valid_probability_distribution() {
        let features = vec![1i32, 0i32, 3i32];
        let weights = vec![1i8, -1i8, 0i8, 2i8, -2i8, 1i8, 3i8, -3i8, -1i8];
        let scales = vec![0.1, 0.1, 0.1];
        let biases = vec![0.0, 0.0, 0.0];
        let probs = predict(&features, &weights, &scales, &biases, 3);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }
}
