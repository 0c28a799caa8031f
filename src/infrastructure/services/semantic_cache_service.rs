//! Semantic cache orchestration
//!
//! Normalizes the request, looks for an equivalent cached entry (by text hash
//! or by embedding distance) and either serves the stored artifact or calls
//! the generation backend and persists its output.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use futures::StreamExt;
use tracing::{debug, info, warn};

use super::data_manager::DataManager;
use super::hit_recorder::HitRecorder;
use crate::domain::embedding::{EmbeddingProvider, check_dimension};
use crate::domain::generation::{Artifact, GenerationBackend, GenerationRequest};
use crate::domain::preprocess::{PromptNormalizer, RequestNormalizer};
use crate::domain::semantic_cache::{
    CacheEntry, CacheMode, EntryDraft, EvictionPolicy, SemanticCacheConfig, SemanticCacheStats,
    Unbounded, text_hash,
};
use crate::domain::similarity::{DistanceEvaluator, SimilarityEvaluator, SimilarityResult};
use crate::domain::DomainError;
use crate::infrastructure::observability::{self, LookupOutcome};
use crate::infrastructure::store_factory::StoreHandles;

/// Collaborators handed to `SemanticCacheService::init`
#[derive(Clone)]
pub struct CacheComponents {
    pub stores: StoreHandles,
    pub backend: Arc<dyn GenerationBackend>,
    /// Required in approximate mode
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    /// Defaults to a `PromptNormalizer` built from the cache config
    pub normalizer: Option<Arc<dyn RequestNormalizer>>,
    /// Defaults to a `DistanceEvaluator` over the configured metric
    pub evaluator: Option<Arc<dyn SimilarityEvaluator>>,
    pub eviction: Arc<dyn EvictionPolicy>,
}

impl fmt::Debug for CacheComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheComponents")
            .field("stores", &self.stores)
            .field("backend", &self.backend.provider_name())
            .field("embedder", &self.embedder)
            .field("normalizer", &self.normalizer)
            .field("evaluator", &self.evaluator)
            .field("eviction", &self.eviction)
            .finish()
    }
}

impl CacheComponents {
    pub fn new(stores: StoreHandles, backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            stores,
            backend,
            embedder: None,
            normalizer: None,
            evaluator: None,
            eviction: Arc::new(Unbounded),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn RequestNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn SimilarityEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn with_eviction_policy(mut self, eviction: Arc<dyn EvictionPolicy>) -> Self {
        self.eviction = eviction;
        self
    }
}

/// Outcome of a successful `resolve`
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub artifact: Artifact,
    pub served_from_cache: bool,
    /// Entry served, or the entry just created on a miss
    pub entry_id: String,
    /// Metric score of the accepted candidate; `None` for text matches and misses
    pub similarity: Option<f32>,
}

#[derive(Debug)]
struct Hit {
    entry: CacheEntry,
    similarity: Option<f32>,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    backend_errors: AtomicU64,
}

/// Handle to one initialized semantic cache
///
/// Holds only the immutable configuration and shared store handles, so it can
/// be used from many tasks at once. Several handles may coexist in a process.
pub struct SemanticCacheService {
    config: SemanticCacheConfig,
    data_manager: DataManager,
    backend: Arc<dyn GenerationBackend>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    normalizer: Arc<dyn RequestNormalizer>,
    evaluator: Arc<dyn SimilarityEvaluator>,
    hit_recorder: HitRecorder,
    counters: Counters,
    closed: AtomicBool,
}

impl fmt::Debug for SemanticCacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticCacheService")
            .field("config", &self.config)
            .field("data_manager", &self.data_manager)
            .field("backend", &self.backend.provider_name())
            .field("embedder", &self.embedder)
            .finish_non_exhaustive()
    }
}

impl SemanticCacheService {
    /// Validate the configuration, wire the components and start the hit recorder
    pub async fn init(
        config: SemanticCacheConfig,
        components: CacheComponents,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        let CacheComponents {
            stores,
            backend,
            embedder,
            normalizer,
            evaluator,
            eviction,
        } = components;

        if config.mode == CacheMode::Approximate {
            let Some(embedder) = &embedder else {
                return Err(DomainError::configuration(
                    "Approximate mode requires an embedding provider",
                ));
            };

            if embedder.dimensions() != config.embedding_dimension {
                return Err(DomainError::configuration(format!(
                    "Embedding provider '{}' produces {} dimensions, cache is configured for {}",
                    embedder.provider_name(),
                    embedder.dimensions(),
                    config.embedding_dimension
                )));
            }
        }

        let normalizer = normalizer.unwrap_or_else(|| {
            Arc::new(PromptNormalizer::with_config(config.normalizer.clone()))
        });
        let evaluator = evaluator.unwrap_or_else(|| {
            Arc::new(DistanceEvaluator::new(
                config.metric,
                config.similarity_threshold,
                config.embedding_dimension,
            ))
        });

        let data_manager = DataManager::new(stores).with_eviction_policy(eviction);
        let hit_recorder = HitRecorder::spawn(data_manager.clone(), config.hit_queue_capacity);

        info!(
            mode = %config.mode,
            metric = %config.metric,
            threshold = config.similarity_threshold,
            dimension = config.embedding_dimension,
            backend = backend.provider_name(),
            "Semantic cache initialized"
        );

        Ok(Self {
            config,
            data_manager,
            backend,
            embedder,
            normalizer,
            evaluator,
            hit_recorder,
            counters: Counters::default(),
            closed: AtomicBool::new(false),
        })
    }

    /// Shut this handle down and build a fresh one from new configuration
    pub async fn reinitialize(
        self,
        config: SemanticCacheConfig,
        components: CacheComponents,
    ) -> Result<Self, DomainError> {
        self.shutdown().await;
        drop(self);

        Self::init(config, components).await
    }

    /// Stop the background hit recorder; further resolves fail
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.hit_recorder.shutdown().await;
        info!("Semantic cache shut down");
    }

    pub fn config(&self) -> &SemanticCacheConfig {
        &self.config
    }

    pub fn data_manager(&self) -> &DataManager {
        &self.data_manager
    }

    /// Serve the request from cache, or generate and cache it
    pub async fn resolve(&self, request: &GenerationRequest) -> Result<Resolution, DomainError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DomainError::internal("Semantic cache has been shut down"));
        }

        let started = Instant::now();
        let result = self.resolve_inner(request).await;

        let outcome = match &result {
            Ok(resolution) if resolution.served_from_cache => LookupOutcome::Hit,
            Ok(_) => LookupOutcome::Miss,
            Err(_) => LookupOutcome::Error,
        };
        observability::record_lookup(self.config.mode, outcome, started.elapsed());

        result
    }

    async fn resolve_inner(&self, request: &GenerationRequest) -> Result<Resolution, DomainError> {
        let text = self.normalizer.normalize(request)?;

        let (hit, embedding) = match self.config.mode {
            CacheMode::Exact => (self.lookup_exact(&text).await?, None),
            CacheMode::Approximate => {
                let exact = if self.config.exact_match_first {
                    self.lookup_exact(&text).await?
                } else {
                    None
                };

                match exact {
                    Some(hit) => (Some(hit), None),
                    None => {
                        let embedding = self.embed(&text).await?;
                        (self.lookup_similar(&embedding).await?, Some(embedding))
                    }
                }
            }
        };

        if let Some(hit) = hit {
            if let Some(resolution) = self.serve_hit(hit).await? {
                return Ok(resolution);
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        debug!(mode = %self.config.mode, "Cache miss");

        // Exact-first hits skip embedding, but a miss in approximate mode still needs one
        let embedding = match (self.config.mode, embedding) {
            (CacheMode::Approximate, None) => Some(self.embed(&text).await?),
            (_, embedding) => embedding,
        };

        let artifact = self.generate(request).await?;

        let mut draft = EntryDraft::new(text, artifact.clone());
        if let Some(embedding) = embedding {
            draft = draft.with_embedding(embedding);
        }
        let entry_id = self.data_manager.save(draft).await?;

        Ok(Resolution {
            artifact,
            served_from_cache: false,
            entry_id,
            similarity: None,
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let embedder = self.embedder.as_ref().ok_or_else(|| {
            DomainError::configuration("Approximate mode requires an embedding provider")
        })?;

        let embedding = embedder.embed(text).await.map_err(|e| match e {
            DomainError::Embedding { .. } => e,
            other => DomainError::embedding(embedder.provider_name(), other.to_string()),
        })?;

        check_dimension(&embedding, self.config.embedding_dimension)?;

        Ok(embedding)
    }

    async fn lookup_exact(&self, text: &str) -> Result<Option<Hit>, DomainError> {
        Ok(self
            .data_manager
            .find_exact(&text_hash(text))
            .await?
            .map(|entry| Hit {
                entry,
                similarity: None,
            }))
    }

    async fn lookup_similar(&self, embedding: &[f32]) -> Result<Option<Hit>, DomainError> {
        let query = self
            .data_manager
            .query_candidates(embedding, self.config.max_candidates);

        let mut candidates = match tokio::time::timeout(self.config.index_query_timeout(), query).await
        {
            Ok(candidates) => candidates?,
            Err(_) => {
                warn!(
                    timeout_ms = self.config.index_query_timeout_ms,
                    "Vector index query timed out, treating as no candidates"
                );
                observability::record_index_timeout();
                return Ok(None);
            }
        };

        while let Some(resolved) = candidates.next().await {
            let entry = match resolved.entry {
                Ok(entry) => entry,
                Err(e) if e.is_not_found() => {
                    warn!(entry_id = %resolved.candidate.id, error = %e, "Skipping dangling candidate");
                    observability::record_dangling_entry();
                    continue;
                }
                Err(e) => return Err(e),
            };

            let Some(stored) = entry.embedding() else {
                continue;
            };

            let result =
                SimilarityResult::new(entry.id(), self.evaluator.evaluate(embedding, stored)?);

            debug!(
                entry_id = %result.entry_id,
                score = result.score,
                is_similar = result.is_similar,
                "Evaluated candidate"
            );

            if result.is_similar {
                return Ok(Some(Hit {
                    entry,
                    similarity: Some(result.score),
                }));
            }
        }

        Ok(None)
    }

    /// Fetch the artifact of a hit; `None` if it vanished in the meantime
    async fn serve_hit(&self, hit: Hit) -> Result<Option<Resolution>, DomainError> {
        let artifact = match self.data_manager.fetch_artifact(&hit.entry).await {
            Ok(artifact) => artifact,
            Err(e) if e.is_not_found() => {
                warn!(entry_id = %hit.entry.id(), error = %e, "Artifact missing for cache hit");
                observability::record_dangling_entry();
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        self.hit_recorder.record(hit.entry.id());
        self.counters.hits.fetch_add(1, Ordering::Relaxed);

        if let Some(score) = hit.similarity {
            observability::record_hit_similarity(score);
        }

        debug!(entry_id = %hit.entry.id(), similarity = ?hit.similarity, "Cache hit");

        Ok(Some(Resolution {
            artifact,
            served_from_cache: true,
            entry_id: hit.entry.id().to_string(),
            similarity: hit.similarity,
        }))
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Artifact, DomainError> {
        let provider = self.backend.provider_name();
        let started = Instant::now();

        let result =
            match tokio::time::timeout(self.config.backend_timeout(), self.backend.generate(request))
                .await
            {
                Ok(Ok(artifact)) => Ok(artifact),
                Ok(Err(e @ DomainError::Backend { .. })) => Err(e),
                Ok(Err(e)) => Err(DomainError::backend(provider, e.to_string())),
                Err(_) => Err(DomainError::backend(
                    provider,
                    format!(
                        "Generation timed out after {}ms",
                        self.config.backend_timeout_ms
                    ),
                )),
            };

        observability::record_backend_call(provider, started.elapsed(), result.is_ok());

        if let Err(e) = &result {
            self.counters.backend_errors.fetch_add(1, Ordering::Relaxed);
            warn!(provider, error = %e, "Generation backend failed");
        }

        result
    }

    /// Remove one entry from every store
    pub async fn invalidate(&self, entry_id: &str) -> Result<(), DomainError> {
        if !self.data_manager.delete(entry_id).await? {
            return Err(DomainError::not_found(format!(
                "Cache entry '{}' not found",
                entry_id
            )));
        }

        info!(entry_id = %entry_id, "Cache entry invalidated");
        Ok(())
    }

    /// Remove every entry, returns how many were removed
    pub async fn clear(&self) -> Result<usize, DomainError> {
        let removed = self.data_manager.clear().await?;

        info!(removed, "Cache cleared");
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<SemanticCacheStats, DomainError> {
        let total_entries = self.data_manager.count().await?;
        observability::record_entry_count(total_entries);

        Ok(SemanticCacheStats {
            total_entries,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            backend_errors: self.counters.backend_errors.load(Ordering::Relaxed),
            dropped_hit_records: self.hit_recorder.dropped(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::generation::MockGenerationBackend;
    use crate::domain::similarity::DistanceMetric;
    use crate::domain::semantic_cache::{Candidate, VectorIndex};
    use crate::infrastructure::cache_store::InMemoryCacheStore;
    use crate::infrastructure::vector_index::InMemoryVectorIndex;
    use crate::infrastructure::services::data_manager::faulty::FaultyCacheStore;

    /// Backend producing a distinct artifact per call
    #[derive(Debug, Default)]
    struct CountingBackend {
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl CountingBackend {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationBackend for CountingBackend {
        async fn generate(&self, request: &GenerationRequest) -> Result<Artifact, DomainError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            Ok(Artifact::new(
                format!("{}#{}", request.prompt, n).into_bytes(),
                "image/png",
            ))
        }

        fn provider_name(&self) -> &'static str {
            "counting"
        }
    }

    fn exact_config() -> SemanticCacheConfig {
        SemanticCacheConfig::default()
            .with_mode(CacheMode::Exact)
            .with_embedding_dimension(3)
    }

    fn euclidean_config() -> SemanticCacheConfig {
        SemanticCacheConfig::default()
            .with_embedding_dimension(3)
            .with_metric(DistanceMetric::Euclidean)
            .with_similarity_threshold(0.1)
    }

    fn components(config: &SemanticCacheConfig, backend: Arc<dyn GenerationBackend>) -> CacheComponents {
        CacheComponents::new(StoreHandles::in_memory(config), backend)
    }

    fn scenario_embedder() -> MockEmbeddingProvider {
        MockEmbeddingProvider::new(3)
            .with_vector("a cat", vec![1.0, 0.0, 0.0])
            .with_vector("a kitten", vec![1.0, 0.0, 0.01])
            .with_vector("a dog", vec![0.0, 1.0, 0.0])
    }

    async fn approximate_service(backend: Arc<CountingBackend>) -> SemanticCacheService {
        let config = euclidean_config();
        let components =
            components(&config, backend).with_embedder(Arc::new(scenario_embedder()));

        SemanticCacheService::init(config, components).await.unwrap()
    }

    #[tokio::test]
    async fn test_second_resolve_is_served_from_cache() {
        let backend = Arc::new(CountingBackend::default());
        let service = approximate_service(backend.clone()).await;
        let request = GenerationRequest::new("a cat");

        let first = service.resolve(&request).await.unwrap();
        let second = service.resolve(&request).await.unwrap();

        assert!(!first.served_from_cache);
        assert!(second.served_from_cache);
        assert_eq!(first.artifact, second.artifact);
        assert_eq!(first.entry_id, second.entry_id);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_euclidean_threshold_scenario() {
        let backend = Arc::new(CountingBackend::default());
        let service = approximate_service(backend.clone()).await;

        let stored = service.resolve(&GenerationRequest::new("a cat")).await.unwrap();

        let near = service
            .resolve(&GenerationRequest::new("a kitten"))
            .await
            .unwrap();
        assert!(near.served_from_cache);
        assert_eq!(near.artifact, stored.artifact);
        let score = near.similarity.unwrap();
        assert!((score - 0.01).abs() < 1e-4);

        let far = service.resolve(&GenerationRequest::new("a dog")).await.unwrap();
        assert!(!far.served_from_cache);
        assert_ne!(far.artifact, stored.artifact);

        assert_eq!(backend.calls(), 2);
        assert_eq!(service.stats().await.unwrap().total_entries, 2);
    }

    #[tokio::test]
    async fn test_cosine_default_metric() {
        let config = SemanticCacheConfig::default().with_embedding_dimension(3);
        let backend = Arc::new(CountingBackend::default());
        let embedder = MockEmbeddingProvider::new(3)
            .with_vector("red fox", vec![1.0, 0.1, 0.0])
            .with_vector("a red fox", vec![1.0, 0.12, 0.0])
            .with_vector("spreadsheet", vec![0.0, 0.0, 1.0]);
        let service = SemanticCacheService::init(
            config.clone(),
            components(&config, backend.clone()).with_embedder(Arc::new(embedder)),
        )
        .await
        .unwrap();

        service.resolve(&GenerationRequest::new("red fox")).await.unwrap();

        let similar = service
            .resolve(&GenerationRequest::new("a red fox"))
            .await
            .unwrap();
        assert!(similar.served_from_cache);
        assert!(similar.similarity.unwrap() >= 0.95);

        let unrelated = service
            .resolve(&GenerationRequest::new("spreadsheet"))
            .await
            .unwrap();
        assert!(!unrelated.served_from_cache);
    }

    #[tokio::test]
    async fn test_exact_mode_matches_text_only() {
        let config = exact_config();
        let backend = Arc::new(CountingBackend::default());
        let service = SemanticCacheService::init(config.clone(), components(&config, backend.clone()))
            .await
            .unwrap();

        let cat = service.resolve(&GenerationRequest::new("a cat")).await.unwrap();
        assert!(!cat.served_from_cache);

        let again = service
            .resolve(&GenerationRequest::builder("  a   cat ").size("1024x1024").build())
            .await
            .unwrap();
        assert!(again.served_from_cache);
        assert_eq!(again.artifact, cat.artifact);
        assert!(again.similarity.is_none());

        let dog = service.resolve(&GenerationRequest::new("a dog")).await.unwrap();
        assert!(!dog.served_from_cache);

        assert_eq!(backend.calls(), 2);
        assert_eq!(
            service.data_manager().vector_index().count().await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_exact_match_first_skips_embedder() {
        let backend = Arc::new(CountingBackend::default());
        let embedder = Arc::new(scenario_embedder());
        let config = euclidean_config();
        let service = SemanticCacheService::init(
            config.clone(),
            components(&config, backend).with_embedder(embedder.clone()),
        )
        .await
        .unwrap();

        service.resolve(&GenerationRequest::new("a cat")).await.unwrap();
        let calls_after_miss = embedder.calls();

        let hit = service.resolve(&GenerationRequest::new("a cat")).await.unwrap();

        assert!(hit.served_from_cache);
        assert_eq!(embedder.calls(), calls_after_miss);
    }

    #[tokio::test]
    async fn test_without_exact_match_first_embeds_every_lookup() {
        let backend = Arc::new(CountingBackend::default());
        let embedder = Arc::new(scenario_embedder());
        let config = euclidean_config().with_exact_match_first(false);
        let service = SemanticCacheService::init(
            config.clone(),
            components(&config, backend).with_embedder(embedder.clone()),
        )
        .await
        .unwrap();

        service.resolve(&GenerationRequest::new("a cat")).await.unwrap();
        let hit = service.resolve(&GenerationRequest::new("a cat")).await.unwrap();

        assert!(hit.served_from_cache);
        assert_eq!(hit.similarity, Some(0.0));
        assert_eq!(embedder.calls(), 2);
    }

    #[tokio::test]
    async fn test_backend_failure_writes_nothing() {
        let config = exact_config();
        let mut backend = MockGenerationBackend::new();
        backend
            .expect_generate()
            .times(1)
            .returning(|_| Err(DomainError::backend("mock", "quota exceeded")));
        backend.expect_provider_name().return_const("mock");

        let service = SemanticCacheService::init(config.clone(), components(&config, Arc::new(backend)))
            .await
            .unwrap();

        let result = service.resolve(&GenerationRequest::new("a cat")).await;

        assert!(matches!(result, Err(DomainError::Backend { .. })));
        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.backend_errors, 1);
        assert_eq!(service.data_manager().object_store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_backend_is_called_once_per_miss() {
        let config = exact_config();
        let mut backend = MockGenerationBackend::new();
        backend
            .expect_generate()
            .times(1)
            .returning(|_| Ok(Artifact::new(vec![7u8; 4], "image/png")));
        backend.expect_provider_name().return_const("mock");

        let service = SemanticCacheService::init(config.clone(), components(&config, Arc::new(backend)))
            .await
            .unwrap();

        for _ in 0..3 {
            let resolution = service.resolve(&GenerationRequest::new("a cat")).await.unwrap();
            assert_eq!(resolution.artifact.data().len(), 4);
        }
    }

    #[tokio::test]
    async fn test_backend_timeout_is_backend_error() {
        let config = exact_config().with_backend_timeout(Duration::from_millis(20));
        let backend = Arc::new(CountingBackend {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let service = SemanticCacheService::init(config.clone(), components(&config, backend))
            .await
            .unwrap();

        let result = service.resolve(&GenerationRequest::new("a cat")).await;

        match result {
            Err(DomainError::Backend { message, .. }) => assert!(message.contains("timed out")),
            other => panic!("expected backend error, got {:?}", other),
        }
        assert_eq!(service.stats().await.unwrap().total_entries, 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_surfaced() {
        let config = euclidean_config();
        let backend = Arc::new(CountingBackend::default());
        let embedder = MockEmbeddingProvider::new(3).with_error("model offline");
        let service = SemanticCacheService::init(
            config.clone(),
            components(&config, backend.clone()).with_embedder(Arc::new(embedder)),
        )
        .await
        .unwrap();

        let result = service.resolve(&GenerationRequest::new("a cat")).await;

        assert!(matches!(result, Err(DomainError::Embedding { .. })));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_wrong_embedding_length_is_dimension_mismatch() {
        let config = euclidean_config();
        let backend = Arc::new(CountingBackend::default());
        let embedder = MockEmbeddingProvider::new(3).with_vector("a cat", vec![1.0, 0.0]);
        let service = SemanticCacheService::init(
            config.clone(),
            components(&config, backend.clone()).with_embedder(Arc::new(embedder)),
        )
        .await
        .unwrap();

        let result = service.resolve(&GenerationRequest::new("a cat")).await;

        assert!(matches!(
            result,
            Err(DomainError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_prompt_is_invalid_request() {
        let config = exact_config();
        let backend = Arc::new(CountingBackend::default());
        let service = SemanticCacheService::init(config.clone(), components(&config, backend.clone()))
            .await
            .unwrap();

        let result = service.resolve(&GenerationRequest::new("   ")).await;

        assert!(matches!(result, Err(DomainError::InvalidRequest { .. })));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_dangling_candidate_is_a_soft_miss() {
        let backend = Arc::new(CountingBackend::default());
        let service = approximate_service(backend.clone()).await;

        let first = service.resolve(&GenerationRequest::new("a cat")).await.unwrap();
        service
            .data_manager()
            .cache_store()
            .delete(&first.entry_id)
            .await
            .unwrap();

        let second = service
            .resolve(&GenerationRequest::new("a kitten"))
            .await
            .unwrap();

        assert!(!second.served_from_cache);
        assert_eq!(backend.calls(), 2);
    }

    /// Vector index whose searches outlast any sensible query timeout
    #[derive(Debug)]
    struct SlowIndex {
        inner: InMemoryVectorIndex,
        delay: Duration,
    }

    #[async_trait]
    impl VectorIndex for SlowIndex {
        async fn add(&self, id: &str, vector: Vec<f32>) -> Result<(), DomainError> {
            self.inner.add(id, vector).await
        }

        async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Candidate>, DomainError> {
            tokio::time::sleep(self.delay).await;
            self.inner.search(query, k).await
        }

        async fn get(&self, id: &str) -> Result<Option<Vec<f32>>, DomainError> {
            self.inner.get(id).await
        }

        async fn delete(&self, id: &str) -> Result<bool, DomainError> {
            self.inner.delete(id).await
        }

        async fn count(&self) -> Result<usize, DomainError> {
            self.inner.count().await
        }

        fn backend_name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_index_timeout_is_a_miss() {
        let config = euclidean_config()
            .with_exact_match_first(false)
            .with_index_query_timeout(Duration::from_millis(20));
        let backend = Arc::new(CountingBackend::default());
        let mut stores = StoreHandles::in_memory(&config);
        stores.vector_index = Arc::new(SlowIndex {
            inner: InMemoryVectorIndex::new(3, DistanceMetric::Euclidean),
            delay: Duration::from_millis(200),
        });
        let components = CacheComponents::new(stores, backend.clone())
            .with_embedder(Arc::new(scenario_embedder()));
        let service = SemanticCacheService::init(config, components).await.unwrap();
        let request = GenerationRequest::new("a cat");

        let first = service.resolve(&request).await.unwrap();
        let second = service.resolve(&request).await.unwrap();

        assert!(!first.served_from_cache);
        assert!(!second.served_from_cache);
        assert_eq!(backend.calls(), 2);
        assert_eq!(service.stats().await.unwrap().total_entries, 2);
    }

    #[tokio::test]
    async fn test_missing_artifact_is_a_soft_miss() {
        let config = exact_config();
        let backend = Arc::new(CountingBackend::default());
        let service = SemanticCacheService::init(config.clone(), components(&config, backend.clone()))
            .await
            .unwrap();

        let first = service.resolve(&GenerationRequest::new("a cat")).await.unwrap();
        service
            .data_manager()
            .object_store()
            .delete(&first.entry_id)
            .await
            .unwrap();

        let second = service.resolve(&GenerationRequest::new("a cat")).await.unwrap();

        assert!(!second.served_from_cache);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_store_read_failure_is_not_a_miss() {
        let config = exact_config();
        let cache_store = Arc::new(FaultyCacheStore::new(InMemoryCacheStore::new()));
        cache_store.faults.fail_reads.store(true, Ordering::SeqCst);
        let mut stores = StoreHandles::in_memory(&config);
        stores.cache_store = cache_store;
        let backend = Arc::new(CountingBackend::default());

        let service = SemanticCacheService::init(
            config,
            CacheComponents::new(stores, backend.clone()),
        )
        .await
        .unwrap();

        let result = service.resolve(&GenerationRequest::new("a cat")).await;

        assert!(matches!(result, Err(DomainError::Store { .. })));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_save_failure_after_generation_is_surfaced() {
        let config = exact_config();
        let cache_store = Arc::new(FaultyCacheStore::new(InMemoryCacheStore::new()));
        cache_store.faults.fail_writes.store(true, Ordering::SeqCst);
        let mut stores = StoreHandles::in_memory(&config);
        stores.cache_store = cache_store;

        let service = SemanticCacheService::init(
            config,
            CacheComponents::new(stores, Arc::new(CountingBackend::default())),
        )
        .await
        .unwrap();

        let result = service.resolve(&GenerationRequest::new("a cat")).await;

        assert!(matches!(
            result,
            Err(DomainError::PartialWrite {
                rolled_back: true,
                ..
            })
        ));
        assert_eq!(service.data_manager().object_store().count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_create_independent_entries() {
        let config = exact_config();
        let backend = Arc::new(CountingBackend {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let service = Arc::new(
            SemanticCacheService::init(config.clone(), components(&config, backend.clone()))
                .await
                .unwrap(),
        );

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    service.resolve(&GenerationRequest::new("a cat")).await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            let resolution = task.await.unwrap().unwrap();
            assert!(!resolution.served_from_cache);
            ids.push(resolution.entry_id);
        }
        ids.sort();
        ids.dedup();

        assert_eq!(ids.len(), 4);
        assert_eq!(backend.calls(), 4);
        assert_eq!(service.stats().await.unwrap().total_entries, 4);

        let next = service.resolve(&GenerationRequest::new("a cat")).await.unwrap();
        assert!(next.served_from_cache);
    }

    #[tokio::test]
    async fn test_hits_are_counted_after_shutdown() {
        let config = exact_config();
        let service = SemanticCacheService::init(
            config.clone(),
            components(&config, Arc::new(CountingBackend::default())),
        )
        .await
        .unwrap();

        let first = service.resolve(&GenerationRequest::new("a cat")).await.unwrap();
        service.resolve(&GenerationRequest::new("a cat")).await.unwrap();
        service.resolve(&GenerationRequest::new("a cat")).await.unwrap();
        service.shutdown().await;

        let entry = service.data_manager().resolve(&first.entry_id).await.unwrap();
        assert_eq!(entry.hit_count(), 2);

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_resolve_after_shutdown_fails() {
        let config = exact_config();
        let service = SemanticCacheService::init(
            config.clone(),
            components(&config, Arc::new(CountingBackend::default())),
        )
        .await
        .unwrap();

        service.shutdown().await;

        assert!(matches!(
            service.resolve(&GenerationRequest::new("a cat")).await,
            Err(DomainError::Internal { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let config = exact_config();
        let backend = Arc::new(CountingBackend::default());
        let service = SemanticCacheService::init(config.clone(), components(&config, backend.clone()))
            .await
            .unwrap();

        let cat = service.resolve(&GenerationRequest::new("a cat")).await.unwrap();
        service.resolve(&GenerationRequest::new("a dog")).await.unwrap();

        service.invalidate(&cat.entry_id).await.unwrap();
        assert!(service.invalidate(&cat.entry_id).await.unwrap_err().is_not_found());

        let again = service.resolve(&GenerationRequest::new("a cat")).await.unwrap();
        assert!(!again.served_from_cache);

        assert_eq!(service.clear().await.unwrap(), 2);
        assert_eq!(service.stats().await.unwrap().total_entries, 0);
    }

    #[tokio::test]
    async fn test_init_rejects_invalid_setups() {
        let backend: Arc<dyn GenerationBackend> = Arc::new(CountingBackend::default());

        let no_embedder = euclidean_config();
        let result =
            SemanticCacheService::init(no_embedder.clone(), components(&no_embedder, backend.clone()))
                .await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));

        let wrong_dims = euclidean_config();
        let result = SemanticCacheService::init(
            wrong_dims.clone(),
            components(&wrong_dims, backend.clone())
                .with_embedder(Arc::new(MockEmbeddingProvider::new(8))),
        )
        .await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));

        let bad_threshold = exact_config()
            .with_metric(DistanceMetric::Cosine)
            .with_similarity_threshold(1.5);
        let result =
            SemanticCacheService::init(bad_threshold.clone(), components(&bad_threshold, backend))
                .await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_reinitialize_starts_fresh_handle() {
        let config = exact_config();
        let service = SemanticCacheService::init(
            config.clone(),
            components(&config, Arc::new(CountingBackend::default())),
        )
        .await
        .unwrap();
        service.resolve(&GenerationRequest::new("a cat")).await.unwrap();

        let new_config = euclidean_config();
        let backend = Arc::new(CountingBackend::default());
        let service = service
            .reinitialize(
                new_config.clone(),
                components(&new_config, backend.clone())
                    .with_embedder(Arc::new(scenario_embedder())),
            )
            .await
            .unwrap();

        assert_eq!(service.config().mode, CacheMode::Approximate);
        let resolution = service.resolve(&GenerationRequest::new("a cat")).await.unwrap();
        assert!(!resolution.served_from_cache);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_independent_handles_do_not_share_entries() {
        let config = exact_config();
        let first = SemanticCacheService::init(
            config.clone(),
            components(&config, Arc::new(CountingBackend::default())),
        )
        .await
        .unwrap();
        let second = SemanticCacheService::init(
            config.clone(),
            components(&config, Arc::new(CountingBackend::default())),
        )
        .await
        .unwrap();

        first.resolve(&GenerationRequest::new("a cat")).await.unwrap();
        let other = second.resolve(&GenerationRequest::new("a cat")).await.unwrap();

        assert!(!other.served_from_cache);
    }
}
