//! Cosine similarity over embedding vectors.

/// Cosine similarity of two equally sized vectors.
///
/// Returns `None` when the vectors differ in length, either is empty, or
/// either has zero norm. Callers treat `None` as "no similarity signal".
pub fn cosine_similarity(left: &[f64], right: &[f64]) -> Option<f64> {
    if left.is_empty() || right.is_empty() || left.len() != right.len() {
        return None;
    }

    let mut dot = 0.0;
    let mut left_norm_sq = 0.0;
    let mut right_norm_sq = 0.0;
    for (l, r) in left.iter().zip(right.iter()) {
        dot += l * r;
        left_norm_sq += l * l;
        right_norm_sq += r * r;
    }

    let denominator = left_norm_sq.sqrt() * right_norm_sq.sqrt();
    if denominator == 0.0 {
        return None;
    }
    Some(dot / denominator)
}

#[cfg(test)]
mod tests {
    use super::cosine_similarity;

    #[test]
    fn identical_vectors_score_one() {
        let score = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]);
        assert_eq!(score, Some(1.0));
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]);
        assert_eq!(score, Some(0.0));
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let score = cosine_similarity(&[2.0, 2.0], &[-1.0, -1.0]).unwrap();
        assert!((score + 1.0).abs() < 1e-12);
    }

    #[test]
    fn length_mismatch_is_no_signal() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), None);
    }

    #[test]
    fn empty_vectors_are_no_signal() {
        assert_eq!(cosine_similarity(&[], &[]), None);
        assert_eq!(cosine_similarity(&[1.0], &[]), None);
    }

    #[test]
    fn zero_norm_is_no_signal() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), None);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), None);
    }

    #[test]
    fn symmetric_over_assorted_pairs() {
        let pairs: [(&[f64], &[f64]); 4] = [
            (&[0.3, -1.2, 4.0], &[2.5, 0.1, -0.7]),
            (&[1e-3, 1e3], &[7.0, -2.0]),
            (&[1.0, 1.0, 1.0, 1.0], &[0.25, 0.5, 0.75, 1.0]),
            (&[-5.0], &[3.0]),
        ];
        for (a, b) in pairs {
            assert_eq!(cosine_similarity(a, b), cosine_similarity(b, a));
        }
    }
}
