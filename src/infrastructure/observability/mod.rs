//! Observability infrastructure - Tracing and Metrics

mod config;
mod metrics;
mod tracing_setup;

pub use config::{MetricsConfig, ObservabilityConfig, TracingConfig};
pub use metrics::{
    PrometheusMetrics, create_metrics_router, init_metrics, record_collaborator_error,
    record_http_request, record_ingestion, record_rewrite, record_run,
};
pub use tracing_setup::{init_tracer, shutdown_tracing};
