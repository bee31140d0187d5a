use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use askdocs_core::error::Result;
use askdocs_core::traits::Embedder;
use askdocs_core::types::EmbeddingVector;

pub const DEFAULT_HASH_DIM: usize = 1024;

/// Deterministic bag-of-tokens embedder for offline runs and tests.
///
/// Each whitespace token is hashed into one of `dim` buckets and the result
/// is L2-normalized, so texts sharing words score higher than unrelated ones.
/// Text without any token yields an empty vector.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("hash:xxh64:d{dim}") }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self { Self::new(DEFAULT_HASH_DIM) }
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str { &self.id }

    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        if self.dim == 0 || text.split_whitespace().next().is_none() {
            return Ok(Vec::new());
        }
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}
