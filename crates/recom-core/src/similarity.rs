//! Cosine similarity and ranking helpers.

use std::cmp::Ordering;

/// Cosine similarity of two equally sized vectors.
///
/// Returns 0.0 when either vector has zero norm. The result is clamped to
/// [-1, 1] to absorb floating point drift.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    cosine_with_norms(a, norm_a, b, norm_b)
}

/// Same as [`cosine_similarity`] with precomputed norms.
pub fn cosine_with_norms(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    (dot(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn l2_norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Scale `v` to unit length in place; zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Descending order by score. Stable sorts keep ties in input order.
pub fn by_score_desc(a: f32, b: f32) -> Ordering {
    b.total_cmp(&a)
}

/// Round a score to 4 decimal places.
pub fn round4(score: f32) -> f32 {
    (score * 10_000.0).round() / 10_000.0
}
