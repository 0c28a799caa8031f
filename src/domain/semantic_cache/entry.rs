//! Cache entry model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::generation::Artifact;

/// Generate a fresh, unique entry identifier
pub fn new_entry_id() -> String {
    Uuid::new_v4().to_string()
}

/// Stable SHA-256 hex digest of normalized text, used for exact matching
pub fn text_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Metadata row held by the cache store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRow {
    pub id: String,
    pub text: String,
    pub text_hash: String,
    /// Key of the vector in the vector index; `None` for exact-mode entries
    pub embedding_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub hit_count: u64,
}

impl CacheRow {
    pub fn new(id: impl Into<String>, text: impl Into<String>, has_embedding: bool) -> Self {
        let id = id.into();
        let text = text.into();

        Self {
            embedding_ref: has_embedding.then(|| id.clone()),
            text_hash: text_hash(&text),
            id,
            text,
            created_at: Utc::now(),
            hit_count: 0,
        }
    }

    /// Key of the artifact in the object store
    pub fn artifact_ref(&self) -> &str {
        &self.id
    }
}

/// Everything needed to persist a new entry
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub text: String,
    pub embedding: Option<Vec<f32>>,
    pub artifact: Artifact,
}

impl EntryDraft {
    pub fn new(text: impl Into<String>, artifact: Artifact) -> Self {
        Self {
            text: text.into(),
            embedding: None,
            artifact,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// An entry resolved from the cache store joined with its vector
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    row: CacheRow,
    embedding: Option<Vec<f32>>,
}

impl CacheEntry {
    pub fn new(row: CacheRow, embedding: Option<Vec<f32>>) -> Self {
        Self { row, embedding }
    }

    pub fn id(&self) -> &str {
        &self.row.id
    }

    pub fn text(&self) -> &str {
        &self.row.text
    }

    pub fn text_hash(&self) -> &str {
        &self.row.text_hash
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    pub fn artifact_ref(&self) -> &str {
        self.row.artifact_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.row.created_at
    }

    pub fn hit_count(&self) -> u64 {
        self.row.hit_count
    }

    pub fn row(&self) -> &CacheRow {
        &self.row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_hash_is_stable() {
        assert_eq!(text_hash("a cat"), text_hash("a cat"));
        assert_ne!(text_hash("a cat"), text_hash("a dog"));
        assert_eq!(text_hash("a cat").len(), 64);
    }

    #[test]
    fn test_new_entry_ids_are_unique() {
        assert_ne!(new_entry_id(), new_entry_id());
    }

    #[test]
    fn test_row_creation() {
        let row = CacheRow::new("id-1", "a cat", true);

        assert_eq!(row.id, "id-1");
        assert_eq!(row.text_hash, text_hash("a cat"));
        assert_eq!(row.embedding_ref.as_deref(), Some("id-1"));
        assert_eq!(row.artifact_ref(), "id-1");
        assert_eq!(row.hit_count, 0);

        let exact = CacheRow::new("id-2", "a dog", false);
        assert!(exact.embedding_ref.is_none());
    }

    #[test]
    fn test_row_serialization() {
        let row = CacheRow::new("id-1", "a cat", true);
        let json = serde_json::to_string(&row).unwrap();
        let parsed: CacheRow = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, row);
    }

    #[test]
    fn test_entry_accessors() {
        let row = CacheRow::new("id-1", "a cat", true);
        let entry = CacheEntry::new(row, Some(vec![1.0, 0.0, 0.0]));

        assert_eq!(entry.id(), "id-1");
        assert_eq!(entry.text(), "a cat");
        assert_eq!(entry.embedding(), Some(&[1.0, 0.0, 0.0][..]));
        assert_eq!(entry.artifact_ref(), "id-1");
    }
}
