//! Embedding provider implementations

mod hashing;
mod openai;

pub use hashing::HashingEmbeddingProvider;
pub use openai::{DEFAULT_EMBEDDING_MODEL, OpenAiEmbeddingProvider, model_dimensions};
