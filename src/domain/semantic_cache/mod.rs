//! Semantic cache domain models and traits
//!
//! Entries are spread over three stores (metadata, vectors, artifacts) joined
//! by entry id. Matching is either exact (text hash) or approximate
//! (embedding distance).

mod config;
mod entry;
mod eviction;
mod repository;
mod stats;

pub use config::{CacheMode, SemanticCacheConfig};
pub use entry::{CacheEntry, CacheRow, EntryDraft, new_entry_id, text_hash};
pub use eviction::{EvictionPolicy, Unbounded};
pub use repository::{CacheStore, Candidate, ObjectStore, VectorIndex};
pub use stats::SemanticCacheStats;
