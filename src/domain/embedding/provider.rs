//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Trait for embedding providers (OpenAI, local hashing, etc.)
///
/// Maps normalized request text to a vector of `dimensions()` floats.
/// Implementations must be deterministic for a given text within one process.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate the embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Get the dimension of produced vectors
    fn dimensions(&self) -> usize;
}
