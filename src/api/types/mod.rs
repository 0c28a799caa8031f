//! OpenAI-compatible API types

pub mod error;
pub mod generate;
pub mod json;

pub use error::{ApiError, ApiErrorResponse};
pub use generate::{
    CacheClearedResponse, CacheEntryDeletedResponse, CacheStatsResponse, ImageData,
    ImageGenerationRequest, ImageGenerationResponse,
};
pub use json::Json;
