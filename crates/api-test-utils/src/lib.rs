//! # API Test Utilities
//!
//! Shared test utilities for the API server.
//!
//! This crate provides:
//! - RSA signing keys with self-signed certificates (`crypto_fixtures`)
//! - Claim builders with working defaults (`token_builders`)
//! - Server test harness with a mocked JWKS endpoint (`TestApiServer`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use api_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let server = TestApiServer::spawn().await?;
//!     let token = TestSigningKey::primary().sign(&TestClaimsBuilder::new().build());
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/v1/me", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
