//! In-memory cache store implementation

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::semantic_cache::{CacheRow, CacheStore};
use crate::domain::{DomainError, StoreKind};

#[derive(Debug, Default)]
struct Rows {
    by_id: HashMap<String, CacheRow>,
    /// text hash → most recently inserted id with that hash
    by_hash: HashMap<String, String>,
}

/// Thread-safe in-memory metadata table
///
/// Useful for testing and single-process deployments. Data is lost when the
/// process terminates.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    rows: RwLock<Rows>,
}

impl InMemoryCacheStore {
    /// Creates a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_error(e: impl std::fmt::Display) -> DomainError {
        DomainError::store(StoreKind::CacheStore, format!("Failed to acquire lock: {}", e))
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn insert(&self, row: CacheRow) -> Result<(), DomainError> {
        let mut rows = self.rows.write().map_err(Self::lock_error)?;

        if rows.by_id.contains_key(&row.id) {
            return Err(DomainError::store_entry(
                StoreKind::CacheStore,
                &row.id,
                "Entry already exists",
            ));
        }

        rows.by_hash.insert(row.text_hash.clone(), row.id.clone());
        rows.by_id.insert(row.id.clone(), row);

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CacheRow>, DomainError> {
        let rows = self.rows.read().map_err(Self::lock_error)?;

        Ok(rows.by_id.get(id).cloned())
    }

    async fn find_by_text_hash(&self, text_hash: &str) -> Result<Option<String>, DomainError> {
        let rows = self.rows.read().map_err(Self::lock_error)?;

        Ok(rows.by_hash.get(text_hash).cloned())
    }

    async fn increment_hits(&self, id: &str) -> Result<bool, DomainError> {
        let mut rows = self.rows.write().map_err(Self::lock_error)?;

        match rows.by_id.get_mut(id) {
            Some(row) => {
                row.hit_count += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let mut rows = self.rows.write().map_err(Self::lock_error)?;

        let Some(removed) = rows.by_id.remove(id) else {
            return Ok(false);
        };

        if rows.by_hash.get(&removed.text_hash).map(String::as_str) == Some(id) {
            // Another entry with the same text may still exist (concurrent saves)
            let replacement = rows
                .by_id
                .values()
                .filter(|row| row.text_hash == removed.text_hash)
                .max_by_key(|row| row.created_at)
                .map(|row| row.id.clone());

            match replacement {
                Some(other) => {
                    rows.by_hash.insert(removed.text_hash, other);
                }
                None => {
                    rows.by_hash.remove(&removed.text_hash);
                }
            }
        }

        Ok(true)
    }

    async fn ids(&self) -> Result<Vec<String>, DomainError> {
        let rows = self.rows.read().map_err(Self::lock_error)?;

        Ok(rows.by_id.keys().cloned().collect())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let rows = self.rows.read().map_err(Self::lock_error)?;

        Ok(rows.by_id.len())
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}
