//! Domain layer - Core cache logic and entities

pub mod embedding;
pub mod error;
pub mod generation;
pub mod preprocess;
pub mod semantic_cache;
pub mod similarity;

pub use embedding::EmbeddingProvider;
pub use error::{DomainError, StoreKind};
pub use generation::{Artifact, GenerationBackend, GenerationRequest, GenerationRequestBuilder};
pub use preprocess::{NormalizerConfig, PromptNormalizer, RequestNormalizer};
pub use semantic_cache::{
    CacheEntry, CacheMode, CacheRow, CacheStore, Candidate, EntryDraft, EvictionPolicy,
    ObjectStore, SemanticCacheConfig, SemanticCacheStats, Unbounded, VectorIndex,
};
pub use similarity::{
    DistanceEvaluator, DistanceMetric, Evaluation, SimilarityEvaluator, SimilarityResult,
};
