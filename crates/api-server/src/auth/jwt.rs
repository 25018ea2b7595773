//! Bearer-token verification.
//!
//! Verifies RS256 tokens issued by the identity provider against the keys it
//! publishes in its JWKS document.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only the configured algorithm is accepted; the header never chooses it
//! - Audience and issuer are checked before the key set is fetched, so a token
//!   for another tenant or API costs no outbound request
//! - `exp` and `nbf` are validated when present, with clock skew tolerance
//! - Client-visible errors are generic past the claim gates

use crate::auth::claims::{validate_audience, validate_issuer};
use crate::auth::jwks::{build_key_source, KeySetSource};
use crate::auth::keys::resolve_key;
use crate::config::VerifierSettings;
use crate::errors::AuthError;
use crate::observability::metrics;
use common::jwt::{decode_unverified, ClaimSet, TokenHeader, UnverifiedToken};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// A token whose signature and claims have been verified.
///
/// Attached to the request extensions by the auth middleware.
#[derive(Clone)]
pub struct VerifiedToken {
    token: String,
    header: TokenHeader,
    claims: ClaimSet,
}

impl VerifiedToken {
    /// The compact token as presented by the client.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    /// The `sub` claim, if it is a string.
    pub fn subject(&self) -> Option<&str> {
        self.claims.get("sub").and_then(|v| v.as_str())
    }

    /// The `iss` claim.
    pub fn issuer(&self) -> Option<&str> {
        self.claims.get("iss").and_then(|v| v.as_str())
    }

    /// String entries of the `aud` claim.
    pub fn audiences(&self) -> Vec<&str> {
        self.claims
            .get("aud")
            .and_then(|v| v.as_array())
            .map(|auds| auds.iter().filter_map(|a| a.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Redacts the raw token and the subject.
impl fmt::Debug for VerifiedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedToken")
            .field("token", &"[REDACTED]")
            .field("kid", &self.header.kid)
            .field("sub", &"[REDACTED]")
            .field("iss", &self.issuer())
            .field("aud", &self.audiences())
            .finish()
    }
}

/// Verifies bearer tokens against the identity provider's key set.
pub struct TokenVerifier {
    issuer: String,
    audience: String,
    algorithm: Algorithm,
    clock_skew: Duration,
    key_source: Arc<dyn KeySetSource>,
}

impl TokenVerifier {
    /// Create a verifier that reads keys from `key_source`.
    pub fn new(settings: &VerifierSettings, key_source: Arc<dyn KeySetSource>) -> Self {
        Self {
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            algorithm: settings.algorithm,
            clock_skew: settings.clock_skew,
            key_source,
        }
    }

    /// Create a verifier that fetches keys from the configured JWKS URL.
    pub fn from_settings(settings: &VerifierSettings) -> Self {
        let key_source = build_key_source(
            settings.jwks_url.clone(),
            settings.fetch_timeout,
            settings.cache_ttl,
        );
        Self::new(settings, key_source)
    }

    /// Resolve the key a token must be verified with.
    ///
    /// Runs, in order: algorithm check, audience check, issuer check, key-set
    /// fetch, key resolution. The first failure short-circuits, so a claim
    /// rejection never reaches the key source.
    ///
    /// # Errors
    ///
    /// - `AuthError::UnsupportedAlgorithm` - header `alg` is not the configured one
    /// - `AuthError::MissingAudience` / `AuthError::InvalidAudience`
    /// - `AuthError::InvalidIssuer`
    /// - `AuthError::KeySetUnavailable` - the key set could not be fetched
    /// - `AuthError::KeyResolutionFailed` - no usable key for the token's `kid`
    pub async fn validation_key(
        &self,
        unverified: &UnverifiedToken,
    ) -> Result<DecodingKey, AuthError> {
        let alg = unverified
            .header
            .alg
            .as_deref()
            .and_then(|alg| Algorithm::from_str(alg).ok());
        if alg != Some(self.algorithm) {
            tracing::debug!(
                target: "api.auth.jwt",
                alg = ?unverified.header.alg,
                "Token rejected: unsupported algorithm"
            );
            return Err(AuthError::UnsupportedAlgorithm);
        }

        validate_audience(&unverified.claims, &self.audience)?;

        if !validate_issuer(&unverified.claims, &self.issuer) {
            return Err(AuthError::InvalidIssuer);
        }

        let key_set = self.key_source.key_set().await?;

        let key = resolve_key(unverified.header.kid.as_deref(), &key_set)?;

        Ok(key)
    }

    /// Verify a bearer token.
    ///
    /// # Errors
    ///
    /// - `AuthError::MalformedToken` - oversized or structurally invalid token
    /// - Any error of [`TokenVerifier::validation_key`]
    /// - `AuthError::VerificationFailed` - bad signature, expired, or not yet valid
    #[instrument(skip_all, name = "api.auth.verify")]
    pub async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let result = self.verify_token(token).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.code(),
        };
        metrics::record_token_verification(outcome);

        result
    }

    async fn verify_token(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let unverified = decode_unverified(token).map_err(|e| {
            tracing::debug!(target: "api.auth.jwt", error = ?e, "Token parse failed");
            AuthError::MalformedToken
        })?;

        let key = self.validation_key(&unverified).await?;

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = self.clock_skew.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        // Audience and issuer were checked above
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<ClaimSet>(token, &key, &validation).map_err(|e| {
            tracing::debug!(target: "api.auth.jwt", error = %e, "Token verification failed");
            AuthError::VerificationFailed(format!("{:?}", e.kind()))
        })?;

        tracing::debug!(
            target: "api.auth.jwt",
            kid = ?unverified.header.kid,
            "Token verified successfully"
        );

        Ok(VerifiedToken {
            token: token.to_string(),
            header: unverified.header,
            claims: token_data.claims,
        })
    }
}
