//! InTouch API Server Library
//!
//! HTTP API whose protected routes require an RS256 bearer token issued by
//! the identity provider. Tokens are verified against the provider's
//! published JWKS document:
//!
//! ```text
//! middleware/auth.rs -> auth/jwt.rs -> auth/claims.rs
//!                                   -> auth/jwks.rs -> auth/keys.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token verification and key-set retrieval
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication middleware with bypass mode
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
