//! Data manager composing the three stores into one unit
//!
//! Only this type writes to the stores. A save writes the artifact, then the
//! vector, then the metadata row; the row is what makes an entry reachable, so
//! it goes last. Any failure triggers compensating deletes in reverse order.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tracing::{debug, error, warn};

use crate::domain::generation::Artifact;
use crate::domain::semantic_cache::{
    CacheEntry, CacheRow, CacheStore, Candidate, EntryDraft, EvictionPolicy, ObjectStore,
    Unbounded, VectorIndex, new_entry_id,
};
use crate::domain::{DomainError, StoreKind};
use crate::infrastructure::observability;
use crate::infrastructure::store_factory::StoreHandles;

/// A ranked candidate with its lazily resolved entry
#[derive(Debug)]
pub struct ResolvedCandidate {
    pub candidate: Candidate,
    pub entry: Result<CacheEntry, DomainError>,
}

/// Lazy, finite, non-restartable stream of ranked candidates
pub type CandidateStream<'a> = BoxStream<'a, ResolvedCandidate>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveStep {
    Artifact,
    Vector,
    Row,
}

impl SaveStep {
    fn store(&self) -> StoreKind {
        match self {
            SaveStep::Artifact => StoreKind::ObjectStore,
            SaveStep::Vector => StoreKind::VectorIndex,
            SaveStep::Row => StoreKind::CacheStore,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataManager {
    cache_store: Arc<dyn CacheStore>,
    vector_index: Arc<dyn VectorIndex>,
    object_store: Arc<dyn ObjectStore>,
    eviction: Arc<dyn EvictionPolicy>,
}

impl DataManager {
    pub fn new(stores: StoreHandles) -> Self {
        Self {
            cache_store: stores.cache_store,
            vector_index: stores.vector_index,
            object_store: stores.object_store,
            eviction: Arc::new(Unbounded),
        }
    }

    pub fn with_eviction_policy(mut self, eviction: Arc<dyn EvictionPolicy>) -> Self {
        self.eviction = eviction;
        self
    }

    pub fn cache_store(&self) -> &Arc<dyn CacheStore> {
        &self.cache_store
    }

    pub fn vector_index(&self) -> &Arc<dyn VectorIndex> {
        &self.vector_index
    }

    pub fn object_store(&self) -> &Arc<dyn ObjectStore> {
        &self.object_store
    }

    /// Persist a new entry across all stores and return its id
    ///
    /// Fails with `PartialWrite` if any store rejects its part; whatever was
    /// already written is deleted again before returning.
    pub async fn save(&self, draft: EntryDraft) -> Result<String, DomainError> {
        let id = new_entry_id();
        let EntryDraft {
            text,
            embedding,
            artifact,
        } = draft;
        let row = CacheRow::new(&id, text, embedding.is_some());

        let mut attempted = Vec::with_capacity(3);

        attempted.push(SaveStep::Artifact);
        let mut result = self.object_store.put(&id, &artifact).await;

        if result.is_ok() {
            if let Some(vector) = embedding {
                attempted.push(SaveStep::Vector);
                result = self.vector_index.add(&id, vector).await;
            }
        }

        if result.is_ok() {
            attempted.push(SaveStep::Row);
            result = self.cache_store.insert(row).await;
        }

        if let Err(e) = result {
            let failed = attempted.last().copied().unwrap_or(SaveStep::Artifact);
            let rolled_back = self.roll_back(&id, &attempted).await;

            error!(
                entry_id = %id,
                store = %failed.store(),
                rolled_back,
                error = %e,
                "Failed to save cache entry"
            );
            observability::record_partial_write(rolled_back);

            return Err(DomainError::partial_write(
                &id,
                format!("{} write failed: {}", failed.store(), e),
                rolled_back,
            ));
        }

        debug!(entry_id = %id, "Saved cache entry");

        self.evict_after_save(&id).await;

        Ok(id)
    }

    /// Undo the attempted steps in reverse order, returns true if all succeeded
    async fn roll_back(&self, id: &str, attempted: &[SaveStep]) -> bool {
        let mut complete = true;

        for step in attempted.iter().rev() {
            let result = match step {
                SaveStep::Row => self.cache_store.delete(id).await,
                SaveStep::Vector => self.vector_index.delete(id).await,
                SaveStep::Artifact => self.object_store.delete(id).await,
            };

            if let Err(e) = result {
                warn!(entry_id = %id, store = %step.store(), error = %e, "Compensating delete failed");
                complete = false;
            }
        }

        complete
    }

    async fn evict_after_save(&self, saved_id: &str) {
        let victims = match self
            .eviction
            .select_victims(self.cache_store.as_ref(), saved_id)
            .await
        {
            Ok(victims) => victims,
            Err(e) => {
                warn!(entry_id = %saved_id, error = %e, "Eviction policy failed");
                return;
            }
        };

        for victim in victims.iter().filter(|victim| victim.as_str() != saved_id) {
            match self.delete(victim).await {
                Ok(_) => debug!(entry_id = %victim, "Evicted cache entry"),
                Err(e) => warn!(entry_id = %victim, error = %e, "Failed to evict cache entry"),
            }
        }
    }

    /// Join the metadata row and vector of an entry
    ///
    /// `NotFound` if the row is missing, or if a vector it references is.
    pub async fn resolve(&self, id: &str) -> Result<CacheEntry, DomainError> {
        let row = self
            .cache_store
            .get(id)
            .await
            .map_err(|e| e.in_store(StoreKind::CacheStore, id))?
            .ok_or_else(|| DomainError::not_found(format!("Cache entry '{}' not found", id)))?;

        let embedding = match &row.embedding_ref {
            Some(embedding_ref) => Some(
                self.vector_index
                    .get(embedding_ref)
                    .await
                    .map_err(|e| e.in_store(StoreKind::VectorIndex, id))?
                    .ok_or_else(|| {
                        DomainError::not_found(format!("Vector of cache entry '{}' not found", id))
                    })?,
            ),
            None => None,
        };

        Ok(CacheEntry::new(row, embedding))
    }

    /// Load the artifact referenced by an entry
    pub async fn fetch_artifact(&self, entry: &CacheEntry) -> Result<Artifact, DomainError> {
        self.object_store
            .get(entry.artifact_ref())
            .await
            .map_err(|e| e.in_store(StoreKind::ObjectStore, entry.id()))?
            .ok_or_else(|| {
                DomainError::not_found(format!("Artifact of cache entry '{}' not found", entry.id()))
            })
    }

    /// Entry whose normalized text has the given hash, if it still resolves
    pub async fn find_exact(&self, text_hash: &str) -> Result<Option<CacheEntry>, DomainError> {
        let Some(id) = self
            .cache_store
            .find_by_text_hash(text_hash)
            .await
            .map_err(|e| e.in_store(StoreKind::CacheStore, text_hash))?
        else {
            return Ok(None);
        };

        match self.resolve(&id).await {
            Ok(entry) => Ok(Some(entry)),
            Err(e) if e.is_not_found() => {
                warn!(entry_id = %id, error = %e, "Dangling text hash reference");
                observability::record_dangling_entry();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Ranked candidates for a query vector
    ///
    /// The index is queried up front; each entry is only resolved when the
    /// stream is polled, so a consumer that stops early never touches the rest.
    pub async fn query_candidates(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<CandidateStream<'_>, DomainError> {
        let candidates = self
            .vector_index
            .search(vector, k)
            .await
            .map_err(|e| match e {
                DomainError::DimensionMismatch { .. } => e,
                other => other.in_store(StoreKind::VectorIndex, "query"),
            })?;

        debug!(candidates = candidates.len(), k, "Vector index returned candidates");

        Ok(stream::iter(candidates)
            .then(move |candidate| async move {
                let entry = self.resolve(&candidate.id).await;
                ResolvedCandidate { candidate, entry }
            })
            .boxed())
    }

    /// Bump the access counter, returns false if the entry is gone
    pub async fn record_hit(&self, id: &str) -> Result<bool, DomainError> {
        self.cache_store
            .increment_hits(id)
            .await
            .map_err(|e| e.in_store(StoreKind::CacheStore, id))
    }

    /// Remove an entry from every store, returns true if any part existed
    ///
    /// The row goes first so the entry stops resolving before its data does.
    pub async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let row = self
            .cache_store
            .delete(id)
            .await
            .map_err(|e| e.in_store(StoreKind::CacheStore, id));
        let vector = self
            .vector_index
            .delete(id)
            .await
            .map_err(|e| e.in_store(StoreKind::VectorIndex, id));
        let artifact = self
            .object_store
            .delete(id)
            .await
            .map_err(|e| e.in_store(StoreKind::ObjectStore, id));

        Ok(row? | vector? | artifact?)
    }

    /// Remove every entry listed in the cache store, returns how many
    pub async fn clear(&self) -> Result<usize, DomainError> {
        let ids = self.cache_store.ids().await?;
        let mut removed = 0;

        for id in &ids {
            if self.delete(id).await? {
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Number of entries, as seen by the cache store
    pub async fn count(&self) -> Result<usize, DomainError> {
        self.cache_store.count().await
    }
}
