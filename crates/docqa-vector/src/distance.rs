/// `1 - cos(a, b)`, the convention LanceDB uses for `DistanceType::Cosine`.
///
/// Zero-length or mismatched vectors are maximally distant from everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    let denom = na.sqrt() * nb.sqrt();
    if denom <= f32::EPSILON {
        return 1.0;
    }
    1.0 - dot / denom
}
