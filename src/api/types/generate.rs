//! Image generation and cache management API types

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::semantic_cache::SemanticCacheStats;
use crate::domain::GenerationRequest;
use crate::infrastructure::Resolution;

/// OpenAI-compatible image generation request
///
/// Fields other than `prompt` (model, n, size, quality, ...) are forwarded to
/// the backend untouched and do not take part in cache matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

impl From<ImageGenerationRequest> for GenerationRequest {
    fn from(request: ImageGenerationRequest) -> Self {
        GenerationRequest {
            prompt: request.prompt,
            parameters: request.parameters,
        }
    }
}

/// Image generation response, extended with the cache indicator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationResponse {
    pub created: i64,
    pub data: Vec<ImageData>,
    /// True when the image was served from the cache
    pub cached: bool,
    pub cache_entry_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub b64_json: String,
}

impl From<&Resolution> for ImageGenerationResponse {
    fn from(resolution: &Resolution) -> Self {
        Self {
            created: Utc::now().timestamp(),
            data: vec![ImageData {
                b64_json: resolution.artifact.to_base64(),
            }],
            cached: resolution.served_from_cache,
            cache_entry_id: resolution.entry_id.clone(),
            similarity: resolution.similarity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsResponse {
    pub object: String,
    #[serde(flatten)]
    pub stats: SemanticCacheStats,
    pub hit_rate: f32,
}

impl From<SemanticCacheStats> for CacheStatsResponse {
    fn from(stats: SemanticCacheStats) -> Self {
        Self {
            object: "cache.stats".to_string(),
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntryDeletedResponse {
    pub id: String,
    pub object: String,
    pub deleted: bool,
}

impl CacheEntryDeletedResponse {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "cache.entry".to_string(),
            deleted: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheClearedResponse {
    pub object: String,
    pub deleted: usize,
}

impl CacheClearedResponse {
    pub fn new(deleted: usize) -> Self {
        Self {
            object: "cache.cleared".to_string(),
            deleted,
        }
    }
}
