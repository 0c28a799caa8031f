//! Embedding provider domain models and traits

mod provider;
mod vector;

pub use provider::EmbeddingProvider;
pub use vector::{check_dimension, cosine_similarity, euclidean_distance, l2_normalize};

#[cfg(test)]
pub use provider::mock::MockEmbeddingProvider;
