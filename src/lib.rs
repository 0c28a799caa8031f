//! PMP Semantic Cache
//!
//! A caching layer in front of expensive generative APIs:
//! - Exact (text hash) and approximate (embedding distance) matching
//! - Pluggable cache store, vector index and object store backends
//! - OpenAI-compatible image generation endpoint with a cache indicator

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use crate::config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use crate::api::state::AppState;
use crate::config::{BackendConfig, EmbeddingBackend, EmbeddingConfig};
use domain::{CacheMode, EmbeddingProvider, GenerationBackend, SemanticCacheConfig};
use infrastructure::embedding::{HashingEmbeddingProvider, OpenAiEmbeddingProvider};
use infrastructure::generation::OpenAiImageBackend;
use infrastructure::http_client::HttpClient;
use infrastructure::{CacheComponents, SemanticCacheService, StoreFactory};

/// Create application state with the given configuration
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let service = build_cache_service(config).await?;
    Ok(AppState::new(Arc::new(service)))
}

/// Build a semantic cache from configuration: stores, embedder and backend
pub async fn build_cache_service(config: &AppConfig) -> anyhow::Result<SemanticCacheService> {
    let stores = StoreFactory::new()
        .create(&config.stores, &config.cache)
        .await
        .context("Failed to initialize stores")?;

    let backend = create_backend(&config.backend, &config.cache)?;
    let mut components = CacheComponents::new(stores, backend);

    if config.cache.mode == CacheMode::Approximate {
        components = components.with_embedder(create_embedder(&config.embedding, &config.cache)?);
    }

    let service = SemanticCacheService::init(config.cache.clone(), components)
        .await
        .context("Failed to initialize semantic cache")?;

    Ok(service)
}

fn create_backend(
    config: &BackendConfig,
    cache: &SemanticCacheConfig,
) -> anyhow::Result<Arc<dyn GenerationBackend>> {
    let api_key = std::env::var(&config.api_key_env).unwrap_or_else(|_| {
        warn!(
            env = %config.api_key_env,
            "Backend API key not set, cache misses will fail upstream"
        );
        String::new()
    });

    let client = HttpClient::with_timeout(cache.backend_timeout())?;
    let backend = OpenAiImageBackend::with_base_url(client, api_key, &config.base_url)
        .with_default_model(&config.model);

    info!(base_url = %config.base_url, model = %config.model, "Generation backend configured");

    Ok(Arc::new(backend))
}

fn create_embedder(
    config: &EmbeddingConfig,
    cache: &SemanticCacheConfig,
) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let dimensions = config.effective_dimensions(cache);

    let embedder: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingBackend::Hashing => Arc::new(HashingEmbeddingProvider::new(dimensions)),
        EmbeddingBackend::OpenAi => {
            let api_key = std::env::var(&config.api_key_env).with_context(|| {
                format!(
                    "Environment variable {} is required for OpenAI embeddings",
                    config.api_key_env
                )
            })?;
            let client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;

            Arc::new(OpenAiEmbeddingProvider::with_base_url(
                client,
                api_key,
                &config.model,
                dimensions,
                &config.base_url,
            ))
        }
    };

    info!(
        provider = embedder.provider_name(),
        dimensions,
        "Embedding provider configured"
    );

    Ok(embedder)
}
