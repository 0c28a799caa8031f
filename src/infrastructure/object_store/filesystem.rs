//! Filesystem object store
//!
//! Each artifact is kept as two files under the root directory:
//! `{id}.bin` with the raw bytes and `{id}.meta` with a small JSON document
//! holding the content type. Both are written to a temporary name first and
//! renamed into place, data before metadata, so a reader that finds the
//! metadata file always finds complete data.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::domain::generation::Artifact;
use crate::domain::semantic_cache::ObjectStore;
use crate::domain::{DomainError, StoreKind};

const DATA_EXTENSION: &str = "bin";
const META_EXTENSION: &str = "meta";

#[derive(Debug, Serialize, Deserialize)]
struct BlobMeta {
    content_type: String,
    size: usize,
}

/// Object store writing one data file and one metadata sidecar per entry
#[derive(Debug, Clone)]
pub struct FilesystemObjectStore {
    root: PathBuf,
}

impl FilesystemObjectStore {
    /// Open (and create if needed) a store rooted at `root`
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            DomainError::store(
                StoreKind::ObjectStore,
                format!("Failed to create directory '{}': {}", root.display(), e),
            )
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validate_id(id: &str) -> Result<(), DomainError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if !valid {
            return Err(DomainError::store_entry(
                StoreKind::ObjectStore,
                id,
                "Entry id is not a valid file name",
            ));
        }

        Ok(())
    }

    fn path(&self, id: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{}.{}", id, extension))
    }

    fn io_error(id: &str, action: &str, e: std::io::Error) -> DomainError {
        DomainError::store_entry(
            StoreKind::ObjectStore,
            id,
            format!("Failed to {}: {}", action, e),
        )
    }

    async fn write_atomic(&self, id: &str, target: &Path, contents: &[u8]) -> Result<(), DomainError> {
        let tmp = target.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));

        fs::write(&tmp, contents)
            .await
            .map_err(|e| Self::io_error(id, "write temporary file", e))?;

        if let Err(e) = fs::rename(&tmp, target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(Self::io_error(id, "rename temporary file", e));
        }

        Ok(())
    }

    async fn remove_if_exists(&self, id: &str, path: &Path) -> Result<bool, DomainError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(id, "remove file", e)),
        }
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put(&self, id: &str, artifact: &Artifact) -> Result<(), DomainError> {
        Self::validate_id(id)?;

        let meta = BlobMeta {
            content_type: artifact.content_type().to_string(),
            size: artifact.len(),
        };
        let meta_json = serde_json::to_vec(&meta).map_err(|e| {
            DomainError::store_entry(
                StoreKind::ObjectStore,
                id,
                format!("Failed to serialize metadata: {}", e),
            )
        })?;

        self.write_atomic(id, &self.path(id, DATA_EXTENSION), artifact.data())
            .await?;
        self.write_atomic(id, &self.path(id, META_EXTENSION), &meta_json)
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<Artifact>, DomainError> {
        Self::validate_id(id)?;

        let meta_bytes = match fs::read(self.path(id, META_EXTENSION)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(id, "read metadata", e)),
        };

        let meta: BlobMeta = serde_json::from_slice(&meta_bytes).map_err(|e| {
            DomainError::store_entry(
                StoreKind::ObjectStore,
                id,
                format!("Corrupt metadata: {}", e),
            )
        })?;

        let data = match fs::read(self.path(id, DATA_EXTENSION)).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(id, "read data", e)),
        };

        if data.len() != meta.size {
            return Err(DomainError::store_entry(
                StoreKind::ObjectStore,
                id,
                format!("Size mismatch: expected {} bytes, found {}", meta.size, data.len()),
            ));
        }

        Ok(Some(Artifact::new(data, meta.content_type)))
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        Self::validate_id(id)?;

        // Metadata goes first so a concurrent reader sees the entry vanish atomically
        let had_meta = self
            .remove_if_exists(id, &self.path(id, META_EXTENSION))
            .await?;
        let had_data = self
            .remove_if_exists(id, &self.path(id, DATA_EXTENSION))
            .await?;

        Ok(had_meta || had_data)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let mut entries = fs::read_dir(&self.root).await.map_err(|e| {
            DomainError::store(
                StoreKind::ObjectStore,
                format!("Failed to list '{}': {}", self.root.display(), e),
            )
        })?;

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            DomainError::store(StoreKind::ObjectStore, format!("Failed to list entries: {}", e))
        })? {
            if entry.path().extension().and_then(|ext| ext.to_str()) == Some(META_EXTENSION) {
                count += 1;
            }
        }

        Ok(count)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
