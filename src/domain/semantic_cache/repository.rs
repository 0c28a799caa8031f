//! Store traits backing the semantic cache
//!
//! Each store exposes atomic-per-call operations and is responsible for its own
//! internal synchronization. The three stores never reference each other; they
//! are joined only through the entry id.

use std::fmt::Debug;

use async_trait::async_trait;

use super::CacheRow;
use crate::domain::DomainError;
use crate::domain::generation::Artifact;

/// A ranked vector index hit
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    /// Ranking distance, smaller is closer
    pub distance: f32,
}

impl Candidate {
    pub fn new(id: impl Into<String>, distance: f32) -> Self {
        Self {
            id: id.into(),
            distance,
        }
    }
}

/// Metadata table: entry id → request text, hash, embedding ref, timestamps, hits
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Insert a new row; fails if the id already exists
    async fn insert(&self, row: CacheRow) -> Result<(), DomainError>;

    /// Get a row by entry id
    async fn get(&self, id: &str) -> Result<Option<CacheRow>, DomainError>;

    /// Find an entry id whose normalized text has the given hash
    async fn find_by_text_hash(&self, text_hash: &str) -> Result<Option<String>, DomainError>;

    /// Increment the access counter, returns false if the row is gone
    async fn increment_hits(&self, id: &str) -> Result<bool, DomainError>;

    /// Delete a row, returns true if it existed
    async fn delete(&self, id: &str) -> Result<bool, DomainError>;

    /// List all entry ids
    async fn ids(&self) -> Result<Vec<String>, DomainError>;

    /// Number of rows
    async fn count(&self) -> Result<usize, DomainError>;

    /// Backend name for logs and health checks
    fn backend_name(&self) -> &'static str;
}

/// Nearest-neighbor service over stored embeddings
#[async_trait]
pub trait VectorIndex: Send + Sync + Debug {
    /// Add (or replace) the vector of an entry
    async fn add(&self, id: &str, vector: Vec<f32>) -> Result<(), DomainError>;

    /// Up to `k` nearest entries in ascending distance order
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Candidate>, DomainError>;

    /// Get the stored vector of an entry
    async fn get(&self, id: &str) -> Result<Option<Vec<f32>>, DomainError>;

    /// Remove an entry's vector, returns true if it existed
    async fn delete(&self, id: &str) -> Result<bool, DomainError>;

    /// Number of stored vectors
    async fn count(&self) -> Result<usize, DomainError>;

    /// Backend name for logs and health checks
    fn backend_name(&self) -> &'static str;
}

/// Blob storage: entry id → artifact bytes and content type
#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    /// Store (or replace) the artifact of an entry
    async fn put(&self, id: &str, artifact: &Artifact) -> Result<(), DomainError>;

    /// Get the artifact of an entry
    async fn get(&self, id: &str) -> Result<Option<Artifact>, DomainError>;

    /// Remove an artifact, returns true if it existed
    async fn delete(&self, id: &str) -> Result<bool, DomainError>;

    /// Number of stored artifacts
    async fn count(&self) -> Result<usize, DomainError>;

    /// Backend name for logs and health checks
    fn backend_name(&self) -> &'static str;
}
