//! OpenAI-compatible v1 API endpoints

mod cache;
mod images;

use axum::{
    Router,
    routing::{delete, get, post},
};

use super::state::AppState;

/// Response header carrying `HIT` or `MISS`
pub const CACHE_HEADER: &str = "x-cache";

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/images/generations", post(images::create_image))
        .route("/cache/stats", get(cache::get_stats))
        .route("/cache", delete(cache::clear_cache))
        .route("/cache/entries/{entry_id}", delete(cache::delete_entry))
}
