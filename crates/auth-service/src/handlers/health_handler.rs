//! Operational endpoints: liveness and Prometheus scraping.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

/// Handler for GET /metrics
///
/// Returns Prometheus text format. Labels carry no natural keys or tokens.
#[tracing::instrument(skip_all, name = "auth.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
