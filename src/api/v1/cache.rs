//! Cache management endpoints

use axum::extract::{Path, State};

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, CacheClearedResponse, CacheEntryDeletedResponse, CacheStatsResponse, Json,
};

/// GET /v1/cache/stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<CacheStatsResponse>, ApiError> {
    let stats = state.cache.stats().await?;
    Ok(Json(stats.into()))
}

/// DELETE /v1/cache/entries/{entry_id}
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<Json<CacheEntryDeletedResponse>, ApiError> {
    state.cache.invalidate(&entry_id).await?;
    Ok(Json(CacheEntryDeletedResponse::new(entry_id)))
}

/// DELETE /v1/cache
pub async fn clear_cache(
    State(state): State<AppState>,
) -> Result<Json<CacheClearedResponse>, ApiError> {
    let deleted = state.cache.clear().await?;
    Ok(Json(CacheClearedResponse::new(deleted)))
}
