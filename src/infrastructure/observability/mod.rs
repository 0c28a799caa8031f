//! Observability infrastructure - Prometheus metrics

mod config;
mod metrics;

pub use config::MetricsConfig;
pub use self::metrics::{
    LookupOutcome, PrometheusMetrics, create_metrics_router, init_metrics, record_backend_call,
    record_dangling_entry, record_dropped_hit, record_entry_count, record_hit_similarity,
    record_http_request,
    record_index_timeout, record_lookup, record_partial_write,
};
