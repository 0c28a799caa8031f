//! Eviction hook consulted by the data manager after each save

use std::fmt::Debug;

use async_trait::async_trait;

use super::CacheStore;
use crate::domain::DomainError;

/// Chooses entries to remove once a new entry has been saved
///
/// Returned ids are deleted from all stores by the data manager; the policy
/// itself never writes.
#[async_trait]
pub trait EvictionPolicy: Send + Sync + Debug {
    async fn select_victims(
        &self,
        cache_store: &dyn CacheStore,
        saved_id: &str,
    ) -> Result<Vec<String>, DomainError>;
}

/// Never evicts; the cache grows without bound
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

#[async_trait]
impl EvictionPolicy for Unbounded {
    async fn select_victims(
        &self,
        _cache_store: &dyn CacheStore,
        _saved_id: &str,
    ) -> Result<Vec<String>, DomainError> {
        Ok(Vec::new())
    }
}
