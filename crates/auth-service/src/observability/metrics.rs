//! Metrics definitions for the auth service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `kind`: 2 values (student, teacher)
//! - `status`: 2 values (success, error)
//! - `error_category`: 5 values (validation, authentication, cryptographic, internal, none)
//! - `operation`: 3 values (hash, verify, verify_dummy)
//! - `event_type`: 6 values (auth event types)

use common::types::PrincipalKind;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return its handle for `/metrics`.
///
/// # Errors
///
/// Returns an error if a recorder is already installed in this process.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // bcrypt dominates login latency; buckets sized around cost 10..=14
        .set_buckets_for_metric(
            Matcher::Prefix("auth_bcrypt".to_string()),
            &[0.050, 0.100, 0.250, 0.500, 1.000, 2.500],
        )
        .map_err(|e| format!("Failed to set bcrypt buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("auth_login".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000],
        )
        .map_err(|e| format!("Failed to set login buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

fn status_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

// ============================================================================
// Registration & Login
// ============================================================================

/// Metric: `auth_registrations_total`
/// Labels: `kind`, `status`
pub fn record_registration(kind: PrincipalKind, success: bool) {
    counter!("auth_registrations_total", "kind" => kind.as_str(), "status" => status_label(success))
        .increment(1);
}

/// Record login outcome and duration.
///
/// Metric: `auth_logins_total`, `auth_login_duration_seconds`
/// Labels: `kind`, `status`
pub fn record_login(kind: PrincipalKind, success: bool, duration: Duration) {
    let status = status_label(success);
    histogram!("auth_login_duration_seconds", "kind" => kind.as_str(), "status" => status)
        .record(duration.as_secs_f64());
    counter!("auth_logins_total", "kind" => kind.as_str(), "status" => status).increment(1);
}

// ============================================================================
// Tokens
// ============================================================================

/// Metric: `auth_token_refresh_total`
/// Labels: `status`
pub fn record_token_refresh(success: bool) {
    counter!("auth_token_refresh_total", "status" => status_label(success)).increment(1);
}

/// Metric: `auth_token_validations_total`
/// Labels: `status`, `error_category`
pub fn record_token_validation(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("auth_token_validations_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

// ============================================================================
// Crypto
// ============================================================================

/// Record bcrypt operation duration.
///
/// Metric: `auth_bcrypt_duration_seconds`
/// Labels: `operation` (hash, verify, verify_dummy)
pub fn record_bcrypt_duration(operation: &'static str, duration: Duration) {
    histogram!("auth_bcrypt_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

// ============================================================================
// Audit
// ============================================================================

/// Record an auth event that could not be written.
///
/// Metric: `auth_audit_log_failures_total`
/// Labels: `event_type`
pub fn record_audit_log_failure(event_type: &'static str) {
    counter!("auth_audit_log_failures_total", "event_type" => event_type).increment(1);
}
