//! Semantic cache configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::domain::preprocess::NormalizerConfig;
use crate::domain::similarity::DistanceMetric;

/// How cached entries are matched against a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Hit only on identical normalized text (SHA-256 match)
    Exact,
    /// Hit on embeddings within the similarity threshold
    #[default]
    Approximate,
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheMode::Exact => write!(f, "exact"),
            CacheMode::Approximate => write!(f, "approximate"),
        }
    }
}

impl FromStr for CacheMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(CacheMode::Exact),
            "approximate" | "semantic" => Ok(CacheMode::Approximate),
            _ => Err(DomainError::configuration(format!(
                "Unknown cache mode: {}. Valid modes: exact, approximate",
                s
            ))),
        }
    }
}

/// Configuration for the semantic cache
///
/// Built once at initialization and never mutated afterwards. Unknown keys are
/// rejected when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SemanticCacheConfig {
    /// Matching mode
    #[serde(default)]
    pub mode: CacheMode,

    /// Dimension every stored and queried embedding must have
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// Threshold applied in the metric's direction
    /// (max distance for euclidean, min similarity for cosine)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Metric used both for ranking and for the hit decision
    #[serde(default)]
    pub metric: DistanceMetric,

    /// Number of nearest candidates fetched per lookup
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// In approximate mode, try an exact text match before embedding
    #[serde(default = "default_true")]
    pub exact_match_first: bool,

    /// Timeout for a backend generation call in milliseconds
    #[serde(default = "default_backend_timeout_ms")]
    pub backend_timeout_ms: u64,

    /// Timeout for a vector index query in milliseconds
    #[serde(default = "default_index_query_timeout_ms")]
    pub index_query_timeout_ms: u64,

    /// Capacity of the queue feeding best-effort hit counting
    #[serde(default = "default_hit_queue_capacity")]
    pub hit_queue_capacity: usize,

    /// Prompt normalization options
    #[serde(default)]
    pub normalizer: NormalizerConfig,
}

fn default_embedding_dimension() -> usize {
    384
}

fn default_similarity_threshold() -> f32 {
    0.95
}

fn default_max_candidates() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_backend_timeout_ms() -> u64 {
    120_000
}

fn default_index_query_timeout_ms() -> u64 {
    500
}

fn default_hit_queue_capacity() -> usize {
    1024
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            mode: CacheMode::default(),
            embedding_dimension: default_embedding_dimension(),
            similarity_threshold: default_similarity_threshold(),
            metric: DistanceMetric::default(),
            max_candidates: default_max_candidates(),
            exact_match_first: default_true(),
            backend_timeout_ms: default_backend_timeout_ms(),
            index_query_timeout_ms: default_index_query_timeout_ms(),
            hit_queue_capacity: default_hit_queue_capacity(),
            normalizer: NormalizerConfig::default(),
        }
    }
}

impl SemanticCacheConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the backend timeout as Duration
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    /// Get the vector index query timeout as Duration
    pub fn index_query_timeout(&self) -> Duration {
        Duration::from_millis(self.index_query_timeout_ms)
    }

    /// Set the matching mode
    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the embedding dimension
    pub fn with_embedding_dimension(mut self, dimension: usize) -> Self {
        self.embedding_dimension = dimension;
        self
    }

    /// Set the similarity threshold
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set the distance metric
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the number of candidates fetched per lookup
    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = max;
        self
    }

    /// Set whether approximate mode tries an exact match first
    pub fn with_exact_match_first(mut self, enabled: bool) -> Self {
        self.exact_match_first = enabled;
        self
    }

    /// Set the backend timeout
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout_ms = timeout.as_millis().max(1) as u64;
        self
    }

    /// Set the vector index query timeout
    pub fn with_index_query_timeout(mut self, timeout: Duration) -> Self {
        self.index_query_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the normalizer options
    pub fn with_normalizer(mut self, normalizer: NormalizerConfig) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Check the invariants the cache relies on
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.embedding_dimension == 0 {
            return Err(DomainError::configuration(
                "embedding_dimension must be greater than zero",
            ));
        }

        if !self.similarity_threshold.is_finite() {
            return Err(DomainError::configuration("similarity_threshold must be finite"));
        }

        match self.metric {
            DistanceMetric::Euclidean if self.similarity_threshold < 0.0 => {
                return Err(DomainError::configuration(
                    "similarity_threshold must be non-negative for euclidean distance",
                ));
            }
            DistanceMetric::Cosine if !(-1.0..=1.0).contains(&self.similarity_threshold) => {
                return Err(DomainError::configuration(
                    "similarity_threshold must be within [-1, 1] for cosine similarity",
                ));
            }
            _ => {}
        }

        if self.max_candidates == 0 {
            return Err(DomainError::configuration(
                "max_candidates must be greater than zero",
            ));
        }

        if self.hit_queue_capacity == 0 {
            return Err(DomainError::configuration(
                "hit_queue_capacity must be greater than zero",
            ));
        }

        Ok(())
    }
}
