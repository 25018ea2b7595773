//! Observability module for the API server.
//!
//! Provides metrics definitions and instrumentation helpers.

pub mod metrics;
