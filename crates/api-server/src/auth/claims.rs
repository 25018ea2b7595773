//! Claim gates applied before any key material is fetched.
//!
//! Both checks run on the unverified claim set. They only ever reject early;
//! acceptance is decided by the signature check that follows.

use crate::errors::AuthError;
use common::jwt::ClaimSet;
use serde_json::Value;

/// Check that the `aud` claim is an array containing `expected`.
///
/// Matching is exact and case-sensitive. A scalar `aud` is rejected even if it
/// equals `expected`, and non-string array elements never match.
///
/// # Errors
///
/// - `AuthError::MissingAudience` - the claim is absent
/// - `AuthError::InvalidAudience` - the claim is not an array or has no match
pub fn validate_audience(claims: &ClaimSet, expected: &str) -> Result<(), AuthError> {
    match claims.get("aud") {
        None => Err(AuthError::MissingAudience),
        Some(Value::Array(audiences)) => {
            if audiences.iter().any(|aud| aud.as_str() == Some(expected)) {
                Ok(())
            } else {
                Err(AuthError::InvalidAudience)
            }
        }
        Some(_) => Err(AuthError::InvalidAudience),
    }
}

/// Check that the `iss` claim is a string equal to `expected`.
pub fn validate_issuer(claims: &ClaimSet, expected: &str) -> bool {
    claims.get("iss").and_then(Value::as_str) == Some(expected)
}
