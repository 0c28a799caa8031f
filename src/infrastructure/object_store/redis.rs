//! Redis object store implementation

use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::domain::generation::Artifact;
use crate::domain::semantic_cache::ObjectStore;
use crate::domain::{DomainError, StoreKind};
use crate::infrastructure::redis_connection;

/// Object store keeping each artifact in a Redis hash
///
/// Layout:
/// - `{prefix}:blob:{id}` hash with `data` and `content_type` fields
/// - `{prefix}:blobs` set of stored ids
#[derive(Clone)]
pub struct RedisObjectStore {
    connection: ConnectionManager,
    key_prefix: String,
}

impl fmt::Debug for RedisObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisObjectStore")
            .field("key_prefix", &self.key_prefix)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisObjectStore {
    /// Connect to Redis and namespace every key under `key_prefix`
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, DomainError> {
        let connection = redis_connection::connect(url, StoreKind::ObjectStore).await?;

        Ok(Self::with_connection(connection, key_prefix))
    }

    pub fn with_connection(connection: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            connection,
            key_prefix: key_prefix.into(),
        }
    }

    fn blob_key(&self, id: &str) -> String {
        format!("{}:blob:{}", self.key_prefix, id)
    }

    fn index_key(&self) -> String {
        format!("{}:blobs", self.key_prefix)
    }

    fn redis_error(id: Option<&str>, action: &str, e: redis::RedisError) -> DomainError {
        let message = format!("Failed to {}: {}", action, e);

        match id {
            Some(id) => DomainError::store_entry(StoreKind::ObjectStore, id, message),
            None => DomainError::store(StoreKind::ObjectStore, message),
        }
    }
}

#[async_trait]
impl ObjectStore for RedisObjectStore {
    async fn put(&self, id: &str, artifact: &Artifact) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(self.blob_key(id))
            .arg("content_type")
            .arg(artifact.content_type())
            .arg("data")
            .arg(artifact.data().as_ref())
            .ignore()
            .cmd("SADD")
            .arg(self.index_key())
            .arg(id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Self::redis_error(Some(id), "store artifact", e))
    }

    async fn get(&self, id: &str) -> Result<Option<Artifact>, DomainError> {
        let mut conn = self.connection.clone();

        let (data, content_type): (Option<Vec<u8>>, Option<String>) = redis::cmd("HMGET")
            .arg(self.blob_key(id))
            .arg("data")
            .arg("content_type")
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::redis_error(Some(id), "load artifact", e))?;

        Ok(match (data, content_type) {
            (Some(data), Some(content_type)) => Some(Artifact::new(data, content_type)),
            _ => None,
        })
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let (deleted, _): (i64, i64) = redis::pipe()
            .atomic()
            .cmd("DEL")
            .arg(self.blob_key(id))
            .cmd("SREM")
            .arg(self.index_key())
            .arg(id)
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::redis_error(Some(id), "delete artifact", e))?;

        Ok(deleted > 0)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let mut conn = self.connection.clone();

        redis::cmd("SCARD")
            .arg(self.index_key())
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::redis_error(None, "count artifacts", e))
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
