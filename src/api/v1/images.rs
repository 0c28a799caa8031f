//! Image generation endpoint, served through the semantic cache

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::CACHE_HEADER;
use crate::api::state::AppState;
use crate::api::types::{ApiError, ImageGenerationRequest, ImageGenerationResponse, Json};
use crate::domain::GenerationRequest;

/// POST /v1/images/generations
pub async fn create_image(
    State(state): State<AppState>,
    Json(request): Json<ImageGenerationRequest>,
) -> Result<Response, ApiError> {
    let request: GenerationRequest = request.into();
    let resolution = state.cache.resolve(&request).await?;

    debug!(
        entry_id = %resolution.entry_id,
        cached = resolution.served_from_cache,
        "Image request resolved"
    );

    let indicator = if resolution.served_from_cache { "HIT" } else { "MISS" };
    let mut response =
        (StatusCode::OK, Json(ImageGenerationResponse::from(&resolution))).into_response();
    response
        .headers_mut()
        .insert(CACHE_HEADER, HeaderValue::from_static(indicator));

    Ok(response)
}
