use std::hash::Hasher;

use twox_hash::XxHash64;

use recom_core::similarity::normalize;
use recom_core::traits::Embedder;

use crate::vector_size_for_model;

/// Deterministic bag-of-words embedder.
///
/// Each lowercase alphanumeric token is hashed into one of `dim` buckets with
/// a hash-derived sign, and the result is L2-normalized. Texts sharing words
/// score higher under cosine, which is enough to exercise ranking end to end
/// without model files.
pub struct HashEmbedder {
    model_id: String,
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { model_id: format!("hash:d{dim}"), dim }
    }

    /// Same dimension the named model would produce.
    pub fn for_model(model_name: &str) -> Self {
        let dim = vector_size_for_model(model_name);
        Self { model_id: format!("hash:{model_name}"), dim }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.to_lowercase().as_bytes());
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        normalize(&mut v);
        v
    }
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn embed_batch(&self, texts: &[String]) -> recom_core::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
