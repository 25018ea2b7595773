//! Builder patterns for test claim sets.
//!
//! Defaults match what `TestApiServer` is configured to accept, so
//! `TestClaimsBuilder::new().build()` signed with the primary key verifies.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Issuer the test server expects.
pub const TEST_ISSUER: &str = "https://intouch-test.eu.auth0.com/";

/// Audience the test server expects.
pub const TEST_AUDIENCE: &str = "https://api.intouch-test.example";

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestClaimsBuilder::new()
///     .subject("auth0|alice")
///     .audience(&["https://other-api.example"])
///     .expires_in(-60)
///     .build();
/// ```
pub struct TestClaimsBuilder {
    claims: Map<String, Value>,
}

impl TestClaimsBuilder {
    /// Create a new claims builder with defaults: expected issuer, audience
    /// array with the expected audience, issued now, expiring in one hour.
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert("sub".to_string(), json!("auth0|test-user"));
        claims.insert("aud".to_string(), json!([TEST_AUDIENCE]));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        Self { claims }
    }

    /// Set the subject
    pub fn subject(self, subject: &str) -> Self {
        self.claim("sub", json!(subject))
    }

    /// Set the issuer
    pub fn issuer(self, issuer: &str) -> Self {
        self.claim("iss", json!(issuer))
    }

    /// Set the audience array
    pub fn audience(self, audiences: &[&str]) -> Self {
        self.claim("aud", json!(audiences))
    }

    /// Set the audience as a single string instead of an array
    pub fn audience_scalar(self, audience: &str) -> Self {
        self.claim("aud", json!(audience))
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.claim("exp", json!(exp))
    }

    /// Set not-before in seconds from now
    pub fn not_before_in(self, seconds: i64) -> Self {
        let nbf = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.claim("nbf", json!(nbf))
    }

    /// Set an arbitrary claim
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }
}

impl Default for TestClaimsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let claims = TestClaimsBuilder::new().build();

        assert_eq!(claims["iss"], TEST_ISSUER);
        assert_eq!(claims["aud"], json!([TEST_AUDIENCE]));
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_audience_scalar() {
        let claims = TestClaimsBuilder::new().audience_scalar("x").build();
        assert_eq!(claims["aud"], "x");
    }

    #[test]
    fn test_without() {
        let claims = TestClaimsBuilder::new().without("aud").build();
        assert!(claims.get("aud").is_none());
    }

    #[test]
    fn test_expires_in_past() {
        let claims = TestClaimsBuilder::new().expires_in(-10).build();
        assert!(claims["exp"].as_i64().unwrap() < Utc::now().timestamp());
    }
}
