//! Cosine similarity between embeddings.

use crate::error::{RagError, Result};

/// Added to the norm product so all-zero embeddings score 0 instead of NaN.
pub const EPSILON: f64 = 1e-10;

/// Compute cosine similarity: `dot(a, b) / (|a| * |b| + EPSILON)`.
///
/// Accumulates in `f64`. The result lies in `[-1, 1]`.
///
/// # Errors
///
/// Returns [`RagError::DimensionMismatch`] if the vectors differ in length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch { expected: a.len(), actual: b.len() });
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt() + EPSILON)) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn orthogonal_vectors_score_zero() {
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(score.abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let score = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((score + 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap(), 0.0);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let err = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    fn arb_vector(dim: usize) -> impl Strategy<Value = Vec<f32>> {
        proptest::collection::vec(-10.0f32..10.0f32, dim)
    }

    proptest! {
        #[test]
        fn self_similarity_is_one(v in arb_vector(12)) {
            prop_assume!(v.iter().any(|x| x.abs() > 0.1));
            let score = cosine_similarity(&v, &v).unwrap();
            prop_assert!((score - 1.0).abs() < 1e-5, "self similarity was {score}");
        }

        #[test]
        fn similarity_is_symmetric(a in arb_vector(8), b in arb_vector(8)) {
            let ab = cosine_similarity(&a, &b).unwrap();
            let ba = cosine_similarity(&b, &a).unwrap();
            prop_assert_eq!(ab, ba);
            prop_assert!((-1.0..=1.0).contains(&ab));
        }
    }
}
