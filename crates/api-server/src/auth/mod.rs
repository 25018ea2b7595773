//! Bearer-token authentication.
//!
//! # Components
//!
//! - `jwks` - JWKS document types, fetcher and optional cache
//! - `keys` - `kid` to RSA verification key resolution
//! - `claims` - audience and issuer gates
//! - `jwt` - the verifier tying the above together

pub mod claims;
pub mod jwks;
pub mod jwt;
pub mod keys;

pub use jwks::{CachedKeySet, JsonWebKey, JsonWebKeySet, JwksFetcher, KeySetSource};
pub use jwt::{TokenVerifier, VerifiedToken};
