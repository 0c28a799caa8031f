//! Redis cache store implementation

use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::domain::semantic_cache::{CacheRow, CacheStore};
use crate::domain::{DomainError, StoreKind};
use crate::infrastructure::redis_connection;

/// Cache store keeping metadata rows in Redis
///
/// Layout:
/// - `{prefix}:row:{id}` JSON row (hit count excluded), written with `SET NX`
/// - `{prefix}:hits:{id}` access counter, bumped with `INCR`
/// - `{prefix}:hash:{text_hash}` sorted set of row ids with that text, scored by creation time
/// - `{prefix}:ids` set of all row ids
#[derive(Clone)]
pub struct RedisCacheStore {
    connection: ConnectionManager,
    key_prefix: String,
    increment_script: Script,
}

/// Bump the counter only while the row exists; -1 when it is gone
const INCREMENT_HITS_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return redis.call('INCR', KEYS[2])
end
return -1
"#;

impl fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("key_prefix", &self.key_prefix)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCacheStore {
    /// Connect to Redis and namespace every key under `key_prefix`
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, DomainError> {
        let connection = redis_connection::connect(url, StoreKind::CacheStore).await?;

        Ok(Self::with_connection(connection, key_prefix))
    }

    pub fn with_connection(connection: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            connection,
            key_prefix: key_prefix.into(),
            increment_script: Script::new(INCREMENT_HITS_SCRIPT),
        }
    }

    fn row_key(&self, id: &str) -> String {
        format!("{}:row:{}", self.key_prefix, id)
    }

    fn hits_key(&self, id: &str) -> String {
        format!("{}:hits:{}", self.key_prefix, id)
    }

    fn hash_key(&self, text_hash: &str) -> String {
        format!("{}:hash:{}", self.key_prefix, text_hash)
    }

    fn ids_key(&self) -> String {
        format!("{}:ids", self.key_prefix)
    }

    fn redis_error(id: Option<&str>, action: &str, e: impl fmt::Display) -> DomainError {
        let message = format!("Failed to {}: {}", action, e);

        match id {
            Some(id) => DomainError::store_entry(StoreKind::CacheStore, id, message),
            None => DomainError::store(StoreKind::CacheStore, message),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn insert(&self, row: CacheRow) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let json = serde_json::to_string(&CacheRow {
            hit_count: 0,
            ..row.clone()
        })
        .map_err(|e| Self::redis_error(Some(&row.id), "serialize row", e))?;

        let created: bool = conn
            .set_nx(self.row_key(&row.id), json)
            .await
            .map_err(|e| Self::redis_error(Some(&row.id), "insert row", e))?;

        if !created {
            return Err(DomainError::store_entry(
                StoreKind::CacheStore,
                &row.id,
                "Entry already exists",
            ));
        }

        redis::pipe()
            .atomic()
            .cmd("ZADD")
            .arg(self.hash_key(&row.text_hash))
            .arg(row.created_at.timestamp_micros())
            .arg(&row.id)
            .ignore()
            .cmd("SET")
            .arg(self.hits_key(&row.id))
            .arg(row.hit_count)
            .ignore()
            .cmd("SADD")
            .arg(self.ids_key())
            .arg(&row.id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Self::redis_error(Some(&row.id), "index row", e))
    }

    async fn get(&self, id: &str) -> Result<Option<CacheRow>, DomainError> {
        let mut conn = self.connection.clone();

        let (json, hits): (Option<String>, Option<u64>) = redis::cmd("MGET")
            .arg(self.row_key(id))
            .arg(self.hits_key(id))
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::redis_error(Some(id), "load row", e))?;

        let Some(json) = json else {
            return Ok(None);
        };

        let mut row: CacheRow = serde_json::from_str(&json)
            .map_err(|e| Self::redis_error(Some(id), "deserialize row", e))?;
        row.hit_count = hits.unwrap_or(0);

        Ok(Some(row))
    }

    async fn find_by_text_hash(&self, text_hash: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        let newest: Vec<String> = conn
            .zrevrange(self.hash_key(text_hash), 0, 0)
            .await
            .map_err(|e| Self::redis_error(None, "look up text hash", e))?;

        Ok(newest.into_iter().next())
    }

    async fn increment_hits(&self, id: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let mut invocation = self.increment_script.key(self.row_key(id));
        invocation.key(self.hits_key(id));

        let hits: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| Self::redis_error(Some(id), "increment hits", e))?;

        Ok(hits >= 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let Some(row) = self.get(id).await? else {
            return Ok(false);
        };

        let mut conn = self.connection.clone();

        redis::pipe()
            .atomic()
            .cmd("DEL")
            .arg(self.row_key(id))
            .arg(self.hits_key(id))
            .ignore()
            .cmd("SREM")
            .arg(self.ids_key())
            .arg(id)
            .ignore()
            .cmd("ZREM")
            .arg(self.hash_key(&row.text_hash))
            .arg(id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Self::redis_error(Some(id), "delete row", e))?;

        Ok(true)
    }

    async fn ids(&self) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.smembers(self.ids_key())
            .await
            .map_err(|e| Self::redis_error(None, "list ids", e))
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let mut conn = self.connection.clone();

        conn.scard(self.ids_key())
            .await
            .map_err(|e| Self::redis_error(None, "count rows", e))
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
