//! Middleware for the API server.
//!
//! # Components
//!
//! - `auth` - Authentication middleware for protected routes

pub mod auth;

pub use auth::{authenticate, extract_bearer_token, AuthState};
