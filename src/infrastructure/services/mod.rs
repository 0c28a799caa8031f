//! Services composing the stores, providers and backend into the cache

mod data_manager;
mod hit_recorder;
mod semantic_cache_service;

pub use data_manager::{CandidateStream, DataManager, ResolvedCandidate};
pub use hit_recorder::HitRecorder;
pub use semantic_cache_service::{CacheComponents, Resolution, SemanticCacheService};
