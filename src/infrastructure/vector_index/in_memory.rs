//! In-memory vector index using linear search

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::domain::embedding::check_dimension;
use crate::domain::semantic_cache::{Candidate, VectorIndex};
use crate::domain::similarity::DistanceMetric;
use crate::domain::{DomainError, StoreKind};

#[derive(Debug)]
struct IndexedVector {
    /// Insertion order, breaks distance ties
    seq: u64,
    vector: Vec<f32>,
}

/// Flat-scan vector index
///
/// Every search compares the query against all stored vectors. Equal distances
/// are ordered by insertion, oldest first, so results are deterministic.
#[derive(Debug)]
pub struct InMemoryVectorIndex {
    dimension: usize,
    metric: DistanceMetric,
    vectors: RwLock<HashMap<String, IndexedVector>>,
    next_seq: AtomicU64,
}

impl InMemoryVectorIndex {
    /// Create an empty index for vectors of the given dimension
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            dimension,
            metric,
            vectors: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn lock_error(e: impl std::fmt::Display) -> DomainError {
        DomainError::store(StoreKind::VectorIndex, format!("Failed to acquire lock: {}", e))
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn add(&self, id: &str, vector: Vec<f32>) -> Result<(), DomainError> {
        check_dimension(&vector, self.dimension)?;

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut vectors = self.vectors.write().map_err(Self::lock_error)?;
        vectors.insert(id.to_string(), IndexedVector { seq, vector });

        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Candidate>, DomainError> {
        check_dimension(query, self.dimension)?;

        if k == 0 {
            return Ok(Vec::new());
        }

        let vectors = self.vectors.read().map_err(Self::lock_error)?;

        let mut ranked: Vec<(f32, u64, &str)> = vectors
            .iter()
            .map(|(id, indexed)| {
                (
                    self.metric.distance(query, &indexed.vector),
                    indexed.seq,
                    id.as_str(),
                )
            })
            .filter(|(distance, _, _)| !distance.is_nan())
            .collect();

        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .map(|(distance, _, id)| Candidate::new(id, distance))
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Vec<f32>>, DomainError> {
        let vectors = self.vectors.read().map_err(Self::lock_error)?;

        Ok(vectors.get(id).map(|indexed| indexed.vector.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let mut vectors = self.vectors.write().map_err(Self::lock_error)?;

        Ok(vectors.remove(id).is_some())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let vectors = self.vectors.read().map_err(Self::lock_error)?;

        Ok(vectors.len())
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}
