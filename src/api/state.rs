//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::SemanticCacheService;

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub cache: Arc<SemanticCacheService>,
}

impl AppState {
    pub fn new(cache: Arc<SemanticCacheService>) -> Self {
        Self { cache }
    }
}
