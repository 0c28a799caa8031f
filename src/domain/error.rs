use std::fmt;

use thiserror::Error;

/// Backing store an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    CacheStore,
    VectorIndex,
    ObjectStore,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::CacheStore => write!(f, "cache_store"),
            StoreKind::VectorIndex => write!(f, "vector_index"),
            StoreKind::ObjectStore => write!(f, "object_store"),
        }
    }
}

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Embedding error: {provider} - {message}")]
    Embedding { provider: String, message: String },

    #[error("Backend error: {provider} - {message}")]
    Backend { provider: String, message: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Partial write for entry '{entry_id}': {message} (rolled back: {rolled_back})")]
    PartialWrite {
        entry_id: String,
        message: String,
        rolled_back: bool,
    },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Store error: {store}{} - {message}", entry_suffix(.entry_id))]
    Store {
        store: StoreKind,
        entry_id: Option<String>,
        message: String,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn entry_suffix(entry_id: &Option<String>) -> String {
    match entry_id {
        Some(id) => format!(" [{}]", id),
        None => String::new(),
    }
}

impl DomainError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Embedding {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    pub fn partial_write(
        entry_id: impl Into<String>,
        message: impl Into<String>,
        rolled_back: bool,
    ) -> Self {
        Self::PartialWrite {
            entry_id: entry_id.into(),
            message: message.into(),
            rolled_back,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn store(store: StoreKind, message: impl Into<String>) -> Self {
        Self::Store {
            store,
            entry_id: None,
            message: message.into(),
        }
    }

    pub fn store_entry(
        store: StoreKind,
        entry_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Store {
            store,
            entry_id: Some(entry_id.into()),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wraps an error raised by a store with the store and entry it concerns.
    ///
    /// Errors that already carry store context are passed through unchanged.
    pub fn in_store(self, store: StoreKind, entry_id: &str) -> Self {
        match self {
            err @ DomainError::Store { .. } => err,
            other => Self::store_entry(store, entry_id, other.to_string()),
        }
    }

    /// Whether this error denotes a dangling or unknown entry
    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Entry 'abc' not found");
        assert_eq!(error.to_string(), "Not found: Entry 'abc' not found");
        assert!(error.is_not_found());
    }

    #[test]
    fn test_invalid_request_error() {
        let error = DomainError::invalid_request("Prompt is empty");
        assert_eq!(error.to_string(), "Invalid request: Prompt is empty");
    }

    #[test]
    fn test_dimension_mismatch_error() {
        let error = DomainError::dimension_mismatch(3, 4);
        assert_eq!(error.to_string(), "Dimension mismatch: expected 3, got 4");
    }

    #[test]
    fn test_store_error_carries_context() {
        let error = DomainError::store_entry(StoreKind::ObjectStore, "abc", "disk full");
        assert_eq!(error.to_string(), "Store error: object_store [abc] - disk full");

        let error = DomainError::store(StoreKind::VectorIndex, "lock poisoned");
        assert_eq!(error.to_string(), "Store error: vector_index - lock poisoned");
    }

    #[test]
    fn test_in_store_wraps_once() {
        let wrapped = DomainError::internal("boom").in_store(StoreKind::CacheStore, "id-1");
        assert!(matches!(
            wrapped,
            DomainError::Store {
                store: StoreKind::CacheStore,
                ..
            }
        ));

        let rewrapped = wrapped.in_store(StoreKind::ObjectStore, "id-2");
        assert!(matches!(
            rewrapped,
            DomainError::Store {
                store: StoreKind::CacheStore,
                ..
            }
        ));
    }

    #[test]
    fn test_partial_write_error() {
        let error = DomainError::partial_write("id-1", "vector index unavailable", true);
        assert_eq!(
            error.to_string(),
            "Partial write for entry 'id-1': vector index unavailable (rolled back: true)"
        );
    }
}
