//! HTTP routes for the API server.
//!
//! Defines the Axum router.

use crate::handlers;
use crate::middleware::{authenticate, AuthState};
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public, unversioned
/// - `/metrics` - Prometheus metrics endpoint - public, unversioned
/// - `/api/v1/me` - Current caller - requires authentication
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(auth_state: Arc<AuthState>, metrics_handle: PrometheusHandle) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new().route("/health", get(handlers::health_check));

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/api/v1/me", get(handlers::get_me))
        .route_layer(middleware::from_fn_with_state(auth_state, authenticate));

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
