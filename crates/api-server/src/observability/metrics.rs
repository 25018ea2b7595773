//! Metrics definitions for the API server.
//!
//! All metrics follow Prometheus naming conventions:
//! - `api_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `outcome`: `success` or one of the `AuthError::code` values
//! - `status`: `success`, `request_error`, `http_error`, `decode_error`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // JWKS fetches are bounded by the client timeout (seconds range)
        .set_buckets_for_metric(
            Matcher::Prefix("api_jwks_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record the outcome of one bearer-token verification.
///
/// Metric: `api_token_verifications_total`
/// Labels: `outcome`
pub fn record_token_verification(outcome: &'static str) {
    counter!("api_token_verifications_total", "outcome" => outcome).increment(1);
}

/// Record one JWKS fetch.
///
/// Metric: `api_jwks_fetch_total`, `api_jwks_fetch_duration_seconds`
/// Labels: `status`
pub fn record_jwks_fetch(status: &'static str, duration: Duration) {
    histogram!("api_jwks_fetch_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());

    counter!("api_jwks_fetch_total", "status" => status).increment(1);
}
