//! JWT utilities shared across the InTouch backend crates.
//!
//! This module provides the parsing that happens *before* any key is known:
//! - Size limits for DoS prevention
//! - Clock skew constants for time-claim leeway
//! - Splitting a compact JWS and decoding its header and claim set
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing returned from this module is trusted: the signature has not been
//!   checked yet. Callers may only use it to select a key and to run
//!   claim-level gates that reject early.
//! - Error messages are generic to prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{decode_unverified, MAX_JWT_SIZE_BYTES};
//!
//! let unverified = decode_unverified(token)?;
//! let kid = unverified.header.kid.as_deref();
//! let aud = unverified.claims.get("aud");
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any base64 decoding or
/// cryptographic operation.
///
/// # Rationale
///
/// - Typical RS256 access tokens are 700-1200 bytes
/// - 8KB allows for generous custom claims while bounding allocation
///
/// Per OWASP API Security Top 10 - API4:2023 (Unrestricted Resource Consumption)
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
///
/// Applied as leeway when checking `exp` and `nbf`.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// This prevents misconfiguration that could weaken security by allowing
/// excessively large clock skew tolerance.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while parsing a JWT before verification.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,
}

// =============================================================================
// Token Types
// =============================================================================

/// Claim set of a token: claim name to raw JSON value.
///
/// Kept untyped so that claim gates can distinguish a scalar `aud` from a
/// sequence, which a typed struct would silently coerce.
pub type ClaimSet = serde_json::Map<String, serde_json::Value>;

/// The JOSE header fields this system reads.
///
/// Fields with an unexpected JSON type are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenHeader {
    /// Signing algorithm claimed by the token (`alg`).
    pub alg: Option<String>,

    /// Key identifier (`kid`). Empty strings are treated as absent.
    pub kid: Option<String>,

    /// Token type (`typ`).
    pub typ: Option<String>,
}

/// A compact JWS split and decoded, with the signature NOT yet verified.
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    /// Decoded JOSE header.
    pub header: TokenHeader,

    /// Decoded claim set.
    pub claims: ClaimSet,
}

#[derive(Deserialize)]
struct RawHeader {
    #[serde(default)]
    alg: serde_json::Value,
    #[serde(default)]
    kid: serde_json::Value,
    #[serde(default)]
    typ: serde_json::Value,
}

fn non_empty_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Split a compact JWS and decode its header and claim set without verifying
/// the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing (denial-of-service prevention)
/// - This function does NOT validate the token signature
/// - The token MUST still be verified once a key has been resolved
///
/// # Errors
///
/// Returns `JwtValidationError` variants:
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong number of segments, bad base64, invalid JSON,
///   or a claim set that is not a JSON object
pub fn decode_unverified(token: &str) -> Result<UnverifiedToken, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    let (Some(header_part), Some(claims_part), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let raw_header: RawHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let claims_bytes = URL_SAFE_NO_PAD.decode(claims_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT claims base64");
        JwtValidationError::MalformedToken
    })?;

    let claims: ClaimSet = serde_json::from_slice(&claims_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT claims JSON");
        JwtValidationError::MalformedToken
    })?;

    Ok(UnverifiedToken {
        header: TokenHeader {
            alg: non_empty_string(raw_header.alg),
            kid: non_empty_string(raw_header.kid),
            typ: non_empty_string(raw_header.typ),
        },
        claims,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn segment(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json)
    }

    fn token_with(header: &str, claims: &str) -> String {
        format!("{}.{}.signature", segment(header), segment(claims))
    }

    // -------------------------------------------------------------------------
    // Constants Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_default_clock_skew_is_5_minutes() {
        assert_eq!(DEFAULT_CLOCK_SKEW, Duration::from_secs(300));
    }

    #[test]
    fn test_max_clock_skew_is_10_minutes() {
        assert_eq!(MAX_CLOCK_SKEW, Duration::from_secs(600));
    }

    // -------------------------------------------------------------------------
    // decode_unverified Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_unverified_valid_token() {
        let token = token_with(
            r#"{"alg":"RS256","typ":"JWT","kid":"key-01"}"#,
            r#"{"iss":"https://issuer.example.com/","aud":["api"]}"#,
        );

        let unverified = decode_unverified(&token).unwrap();

        assert_eq!(unverified.header.alg.as_deref(), Some("RS256"));
        assert_eq!(unverified.header.kid.as_deref(), Some("key-01"));
        assert_eq!(unverified.header.typ.as_deref(), Some("JWT"));
        assert_eq!(
            unverified.claims.get("iss").and_then(|v| v.as_str()),
            Some("https://issuer.example.com/")
        );
        assert!(unverified.claims.get("aud").unwrap().is_array());
    }

    #[test]
    fn test_decode_unverified_keeps_scalar_audience_as_is() {
        let token = token_with(r#"{"alg":"RS256","kid":"k"}"#, r#"{"aud":"api"}"#);

        let unverified = decode_unverified(&token).unwrap();
        assert!(unverified.claims.get("aud").unwrap().is_string());
    }

    #[test]
    fn test_decode_unverified_missing_kid_is_none() {
        let token = token_with(r#"{"alg":"RS256","typ":"JWT"}"#, "{}");

        let unverified = decode_unverified(&token).unwrap();
        assert!(unverified.header.kid.is_none());
    }

    #[test]
    fn test_decode_unverified_non_string_kid_is_none() {
        let token = token_with(r#"{"alg":"RS256","kid":12345}"#, "{}");
        assert_eq!(decode_unverified(&token).unwrap().header.kid, None);
    }

    #[test]
    fn test_decode_unverified_empty_kid_is_none() {
        let token = token_with(r#"{"alg":"RS256","kid":""}"#, "{}");
        assert_eq!(decode_unverified(&token).unwrap().header.kid, None);
    }

    #[test]
    fn test_decode_unverified_wrong_segment_count() {
        assert_eq!(
            decode_unverified("not-a-jwt").unwrap_err(),
            JwtValidationError::MalformedToken
        );
        assert_eq!(
            decode_unverified("only.two").unwrap_err(),
            JwtValidationError::MalformedToken
        );
        assert_eq!(
            decode_unverified("a.b.c.d").unwrap_err(),
            JwtValidationError::MalformedToken
        );
        assert_eq!(
            decode_unverified("").unwrap_err(),
            JwtValidationError::MalformedToken
        );
    }

    #[test]
    fn test_decode_unverified_invalid_base64_header() {
        let result = decode_unverified("!!!invalid!!!.e30.signature");
        assert_eq!(result.unwrap_err(), JwtValidationError::MalformedToken);
    }

    #[test]
    fn test_decode_unverified_invalid_json_claims() {
        let token = format!("{}.{}.sig", segment(r#"{"alg":"RS256"}"#), segment("not-json"));
        let result = decode_unverified(&token);
        assert_eq!(result.unwrap_err(), JwtValidationError::MalformedToken);
    }

    #[test]
    fn test_decode_unverified_claims_must_be_object() {
        let token = token_with(r#"{"alg":"RS256"}"#, r#"["aud"]"#);
        let result = decode_unverified(&token);
        assert_eq!(result.unwrap_err(), JwtValidationError::MalformedToken);
    }

    #[test]
    fn test_decode_unverified_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        let result = decode_unverified(&oversized);
        assert_eq!(result.unwrap_err(), JwtValidationError::TokenTooLarge);
    }

    #[test]
    fn test_decode_unverified_at_size_limit() {
        let header_b64 = segment(r#"{"alg":"RS256","kid":"key"}"#);
        let claims_b64 = segment("{}");
        let sig_len = MAX_JWT_SIZE_BYTES - header_b64.len() - claims_b64.len() - 2;
        let token = format!("{}.{}.{}", header_b64, claims_b64, "s".repeat(sig_len));

        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);

        let result = decode_unverified(&token);
        assert!(result.is_ok(), "Token at size limit should be accepted");
    }

    #[test]
    fn test_error_messages_are_generic() {
        assert_eq!(
            JwtValidationError::TokenTooLarge.to_string(),
            JwtValidationError::MalformedToken.to_string()
        );
    }
}
