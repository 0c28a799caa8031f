//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, extract::State, response::IntoResponse, routing::get};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;
use crate::domain::CacheMode;

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("semantic_cache_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record one HTTP request served by the API
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Outcome of one cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Hit,
    Miss,
    Error,
}

impl LookupOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            LookupOutcome::Hit => "hit",
            LookupOutcome::Miss => "miss",
            LookupOutcome::Error => "error",
        }
    }
}

/// Record a resolved lookup and its end-to-end latency
pub fn record_lookup(mode: CacheMode, outcome: LookupOutcome, duration: Duration) {
    let labels = [
        ("mode", mode.to_string()),
        ("result", outcome.as_str().to_string()),
    ];

    counter!("semantic_cache_lookups_total", &labels).increment(1);
    histogram!("semantic_cache_lookup_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record a backend call made on a miss
pub fn record_backend_call(provider: &str, duration: Duration, success: bool) {
    let labels = [
        ("provider", provider.to_string()),
        ("status", if success { "success" } else { "error" }.to_string()),
    ];

    counter!("semantic_cache_backend_calls_total", &labels).increment(1);
    histogram!("semantic_cache_backend_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record the similarity score of an accepted candidate
pub fn record_hit_similarity(score: f32) {
    histogram!("semantic_cache_hit_similarity").record(score as f64);
}

/// Record a save that failed part way
pub fn record_partial_write(rolled_back: bool) {
    counter!(
        "semantic_cache_partial_writes_total",
        "rolled_back" => rolled_back.to_string()
    )
    .increment(1);
}

/// Record a vector index query that exceeded its deadline
pub fn record_index_timeout() {
    counter!("semantic_cache_index_timeouts_total").increment(1);
}

/// Record a candidate whose id no longer resolves
pub fn record_dangling_entry() {
    counter!("semantic_cache_dangling_entries_total").increment(1);
}

/// Record a hit-count update dropped because the queue was full
pub fn record_dropped_hit() {
    counter!("semantic_cache_dropped_hit_records_total").increment(1);
}

/// Record the current number of entries
pub fn record_entry_count(count: usize) {
    gauge!("semantic_cache_entries").set(count as f64);
}
