//! Shared Redis connection setup for the Redis-backed stores

use redis::Client;
use redis::aio::ConnectionManager;

use crate::domain::{DomainError, StoreKind};

/// Default key namespace for Redis-backed stores
pub const DEFAULT_KEY_PREFIX: &str = "semantic_cache";

/// Open a managed connection, reported as an error of the given store
pub async fn connect(url: &str, store: StoreKind) -> Result<ConnectionManager, DomainError> {
    let client = Client::open(url)
        .map_err(|e| DomainError::store(store, format!("Failed to create Redis client: {}", e)))?;

    ConnectionManager::new(client)
        .await
        .map_err(|e| DomainError::store(store, format!("Failed to connect to Redis: {}", e)))
}
