use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use c4rag_core::error::Result;
use c4rag_core::traits::Embedder;
use c4rag_core::types::Vector;

use crate::{check_input, InputKind};

/// Feature-hashed bag of words.
///
/// Each lowercased alphanumeric token lands in one of `dim` buckets with a
/// hash-derived sign and weight; the result is L2-normalized. Deterministic,
/// model-free, and good enough to rank passages that share vocabulary with
/// the query, which makes it the stand-in for the neural model in tests.
pub struct HashEmbedder {
    dim: usize,
    max_len: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize, max_len: usize) -> Self {
        Self { dim, max_len, id: format!("hash:xxh64:d{}", dim) }
    }

    fn embed_one(&self, text: &str) -> Result<Vector> {
        let mut v = vec![0f32; self.dim];
        if check_input(text)? == InputKind::Blank { return Ok(v); }
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .take(self.max_len);
        for token in tokens {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let weight = 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            let sign = if (h >> 31) & 1 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign * weight;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-6 { for x in &mut v { *x /= norm; } }
        Ok(v)
    }
}

impl Embedder for HashEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}
