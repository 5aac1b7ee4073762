use c4rag_core::config::SimilarityMetric;

#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
	a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
	a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Scales `v` to unit length in place. Zero vectors are left as they are.
pub fn normalize(v: &mut [f32]) {
	let norm = dot(v, v).sqrt();
	if norm > 0.0 && norm.is_finite() {
		for x in v.iter_mut() { *x /= norm; }
	}
}

/// Puts `v` in the form the index scores against.
pub fn prepare(metric: SimilarityMetric, mut v: Vec<f32>) -> Vec<f32> {
	if metric == SimilarityMetric::Cosine { normalize(&mut v); }
	v
}

/// Similarity of two vectors already passed through [`prepare`].
#[inline]
pub fn score(_metric: SimilarityMetric, a: &[f32], b: &[f32]) -> f32 {
	dot(a, b)
}
