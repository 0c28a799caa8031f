//! In-memory object store implementation using moka

use async_trait::async_trait;
use moka::future::Cache as MokaCache;

use crate::domain::DomainError;
use crate::domain::generation::Artifact;
use crate::domain::semantic_cache::ObjectStore;

/// Thread-safe in-memory blob store
///
/// The underlying moka cache is built without a capacity bound, so entries
/// only leave through `delete`. Eviction is decided by the data manager.
#[derive(Debug, Clone)]
pub struct InMemoryObjectStore {
    blobs: MokaCache<String, Artifact>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            blobs: MokaCache::builder().build(),
        }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, id: &str, artifact: &Artifact) -> Result<(), DomainError> {
        self.blobs.insert(id.to_string(), artifact.clone()).await;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Artifact>, DomainError> {
        Ok(self.blobs.get(id).await)
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        Ok(self.blobs.remove(id).await.is_some())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        // Sync pending tasks so entry_count reflects recent writes
        self.blobs.run_pending_tasks().await;
        Ok(self.blobs.entry_count() as usize)
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}
