//! Offline feature-hashing embedding provider

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::DomainError;
use crate::domain::embedding::{EmbeddingProvider, l2_normalize};

/// Deterministic bag-of-words embedder
///
/// Every token and every pair of adjacent tokens is hashed with SHA-256 into
/// one of `dimensions` buckets with a hash-derived sign. The result is
/// L2-normalized, so texts sharing most of their words end up close under
/// both cosine and Euclidean distance. No network access or model weights.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl HashingEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());

        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };

        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        if self.dimensions == 0 {
            return Err(DomainError::embedding(
                "hashing",
                "Embedding dimension must be greater than zero",
            ));
        }

        let tokens: Vec<&str> = text.split_whitespace().collect();
        let mut vector = vec![0.0f32; self.dimensions];

        for token in &tokens {
            self.accumulate(&mut vector, token, 1.0);
        }

        for pair in tokens.windows(2) {
            self.accumulate(&mut vector, &format!("{} {}", pair[0], pair[1]), 0.5);
        }

        l2_normalize(&mut vector);

        Ok(vector)
    }

    fn provider_name(&self) -> &'static str {
        "hashing"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::cosine_similarity;

    #[tokio::test]
    async fn test_embedding_is_deterministic() {
        let provider = HashingEmbeddingProvider::new(64);

        let first = provider.embed("a cat in space").await.unwrap();
        let second = provider.embed("a cat in space").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[tokio::test]
    async fn test_embedding_is_unit_length() {
        let provider = HashingEmbeddingProvider::new(128);

        let vector = provider.embed("a watercolor painting of a fox").await.unwrap();
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_words_are_closer() {
        let provider = HashingEmbeddingProvider::new(256);

        let base = provider.embed("a red fox in the snow").await.unwrap();
        let similar = provider.embed("a red fox in deep snow").await.unwrap();
        let unrelated = provider.embed("quarterly revenue spreadsheet").await.unwrap();

        assert!(cosine_similarity(&base, &similar) > cosine_similarity(&base, &unrelated));
    }

    #[tokio::test]
    async fn test_zero_dimension_is_error() {
        let provider = HashingEmbeddingProvider::new(0);

        assert!(matches!(
            provider.embed("a cat").await,
            Err(DomainError::Embedding { .. })
        ));
    }
}
