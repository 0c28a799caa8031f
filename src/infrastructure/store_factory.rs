//! Store factory for runtime backend selection

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::DomainError;
use crate::domain::semantic_cache::{CacheStore, ObjectStore, SemanticCacheConfig, VectorIndex};

use super::cache_store::{InMemoryCacheStore, PostgresCacheStore, PostgresConfig, RedisCacheStore};
use super::object_store::{FilesystemObjectStore, InMemoryObjectStore, RedisObjectStore};
use super::redis_connection::DEFAULT_KEY_PREFIX;
use super::vector_index::InMemoryVectorIndex;

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_table() -> String {
    "semantic_cache_entries".to_string()
}

fn default_max_connections() -> u32 {
    10
}

/// Metadata table backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum CacheStoreConfig {
    #[default]
    InMemory,
    Redis {
        url: String,
        #[serde(default = "default_key_prefix")]
        key_prefix: String,
    },
    Postgres {
        url: String,
        #[serde(default = "default_table")]
        table: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

/// Nearest-neighbor backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum VectorIndexConfig {
    /// Exhaustive flat scan
    #[default]
    InMemory,
}

/// Blob storage backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ObjectStoreConfig {
    #[default]
    InMemory,
    Filesystem {
        root: PathBuf,
    },
    Redis {
        url: String,
        #[serde(default = "default_key_prefix")]
        key_prefix: String,
    },
}

impl fmt::Display for CacheStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheStoreConfig::InMemory => write!(f, "in_memory"),
            CacheStoreConfig::Redis { .. } => write!(f, "redis"),
            CacheStoreConfig::Postgres { .. } => write!(f, "postgres"),
        }
    }
}

impl fmt::Display for ObjectStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectStoreConfig::InMemory => write!(f, "in_memory"),
            ObjectStoreConfig::Filesystem { .. } => write!(f, "filesystem"),
            ObjectStoreConfig::Redis { .. } => write!(f, "redis"),
        }
    }
}

/// Backend selection for the three stores
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreBackendsConfig {
    #[serde(default)]
    pub cache_store: CacheStoreConfig,
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
}

impl StoreBackendsConfig {
    /// All three stores in memory
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_cache_store(mut self, cache_store: CacheStoreConfig) -> Self {
        self.cache_store = cache_store;
        self
    }

    pub fn with_object_store(mut self, object_store: ObjectStoreConfig) -> Self {
        self.object_store = object_store;
        self
    }
}

/// Store handles shared by the data manager
#[derive(Debug, Clone)]
pub struct StoreHandles {
    pub cache_store: Arc<dyn CacheStore>,
    pub vector_index: Arc<dyn VectorIndex>,
    pub object_store: Arc<dyn ObjectStore>,
}

impl StoreHandles {
    /// In-memory handles for the given cache configuration
    pub fn in_memory(cache: &SemanticCacheConfig) -> Self {
        Self {
            cache_store: Arc::new(InMemoryCacheStore::new()),
            vector_index: Arc::new(InMemoryVectorIndex::new(
                cache.embedding_dimension,
                cache.metric,
            )),
            object_store: Arc::new(InMemoryObjectStore::new()),
        }
    }
}

/// Factory for creating store instances
#[derive(Debug, Default)]
pub struct StoreFactory;

impl StoreFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates all three stores based on configuration
    pub async fn create(
        &self,
        stores: &StoreBackendsConfig,
        cache: &SemanticCacheConfig,
    ) -> Result<StoreHandles, DomainError> {
        let handles = StoreHandles {
            cache_store: self.create_cache_store(&stores.cache_store).await?,
            vector_index: self.create_vector_index(&stores.vector_index, cache),
            object_store: self.create_object_store(&stores.object_store).await?,
        };

        info!(
            cache_store = handles.cache_store.backend_name(),
            vector_index = handles.vector_index.backend_name(),
            object_store = handles.object_store.backend_name(),
            "Stores initialized"
        );

        Ok(handles)
    }

    pub async fn create_cache_store(
        &self,
        config: &CacheStoreConfig,
    ) -> Result<Arc<dyn CacheStore>, DomainError> {
        match config {
            CacheStoreConfig::InMemory => Ok(Arc::new(InMemoryCacheStore::new())),
            CacheStoreConfig::Redis { url, key_prefix } => {
                let store = RedisCacheStore::connect(url, key_prefix.clone()).await?;
                Ok(Arc::new(store))
            }
            CacheStoreConfig::Postgres {
                url,
                table,
                max_connections,
            } => {
                let pg_config = PostgresConfig::new(url.clone()).with_max_connections(*max_connections);
                let store = PostgresCacheStore::connect(&pg_config, table.clone()).await?;
                Ok(Arc::new(store))
            }
        }
    }

    pub fn create_vector_index(
        &self,
        config: &VectorIndexConfig,
        cache: &SemanticCacheConfig,
    ) -> Arc<dyn VectorIndex> {
        match config {
            VectorIndexConfig::InMemory => Arc::new(InMemoryVectorIndex::new(
                cache.embedding_dimension,
                cache.metric,
            )),
        }
    }

    pub async fn create_object_store(
        &self,
        config: &ObjectStoreConfig,
    ) -> Result<Arc<dyn ObjectStore>, DomainError> {
        match config {
            ObjectStoreConfig::InMemory => Ok(Arc::new(InMemoryObjectStore::new())),
            ObjectStoreConfig::Filesystem { root } => {
                let store = FilesystemObjectStore::new(root.clone()).await?;
                Ok(Arc::new(store))
            }
            ObjectStoreConfig::Redis { url, key_prefix } => {
                let store = RedisObjectStore::connect(url, key_prefix.clone()).await?;
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generation::Artifact;
    use crate::domain::semantic_cache::CacheRow;

    #[test]
    fn test_backends_default_to_in_memory() {
        let config = StoreBackendsConfig::default();

        assert_eq!(config.cache_store, CacheStoreConfig::InMemory);
        assert_eq!(config.vector_index, VectorIndexConfig::InMemory);
        assert_eq!(config.object_store, ObjectStoreConfig::InMemory);
    }

    #[test]
    fn test_backend_config_deserialize() {
        let json = serde_json::json!({
            "cache_store": { "type": "postgres", "url": "postgres://localhost/cache" },
            "object_store": { "type": "filesystem", "root": "/var/cache/blobs" }
        });

        let config: StoreBackendsConfig = serde_json::from_value(json).unwrap();

        assert_eq!(
            config.cache_store,
            CacheStoreConfig::Postgres {
                url: "postgres://localhost/cache".to_string(),
                table: "semantic_cache_entries".to_string(),
                max_connections: 10,
            }
        );
        assert_eq!(
            config.object_store,
            ObjectStoreConfig::Filesystem {
                root: PathBuf::from("/var/cache/blobs")
            }
        );
        assert_eq!(config.vector_index, VectorIndexConfig::InMemory);
    }

    #[test]
    fn test_backend_config_rejects_unknown_type() {
        let json = serde_json::json!({ "vector_index": { "type": "qdrant" } });

        assert!(serde_json::from_value::<StoreBackendsConfig>(json).is_err());
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(CacheStoreConfig::InMemory.to_string(), "in_memory");
        assert_eq!(
            ObjectStoreConfig::Redis {
                url: "redis://localhost".to_string(),
                key_prefix: default_key_prefix(),
            }
            .to_string(),
            "redis"
        );
    }

    #[tokio::test]
    async fn test_factory_create_in_memory() {
        let factory = StoreFactory::new();
        let cache = SemanticCacheConfig::default().with_embedding_dimension(4);

        let handles = factory
            .create(&StoreBackendsConfig::in_memory(), &cache)
            .await
            .unwrap();

        handles
            .cache_store
            .insert(CacheRow::new("id-1", "a cat", true))
            .await
            .unwrap();
        handles
            .vector_index
            .add("id-1", vec![1.0, 0.0, 0.0, 0.0])
            .await
            .unwrap();
        handles
            .object_store
            .put("id-1", &Artifact::new(vec![1u8], "image/png"))
            .await
            .unwrap();

        assert_eq!(handles.cache_store.count().await.unwrap(), 1);
        assert_eq!(handles.vector_index.count().await.unwrap(), 1);
        assert_eq!(handles.object_store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_factory_create_filesystem_object_store() {
        let dir = tempfile::tempdir().unwrap();
        let factory = StoreFactory::new();

        let store = factory
            .create_object_store(&ObjectStoreConfig::Filesystem {
                root: dir.path().to_path_buf(),
            })
            .await
            .unwrap();

        assert_eq!(store.backend_name(), "filesystem");
    }

    #[tokio::test]
    async fn test_factory_vector_index_uses_cache_dimension() {
        let factory = StoreFactory::new();
        let cache = SemanticCacheConfig::default().with_embedding_dimension(3);

        let index = factory.create_vector_index(&VectorIndexConfig::InMemory, &cache);

        assert!(index.add("id-1", vec![1.0, 2.0]).await.is_err());
        assert!(index.add("id-1", vec![1.0, 2.0, 3.0]).await.is_ok());
    }
}
