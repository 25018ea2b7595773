//! JWKS client for fetching the published signing keys.
//!
//! The JWKS (JSON Web Key Set) client fetches the identity provider's
//! `/.well-known/jwks.json` document. By default every call re-fetches the
//! document so key rotations are picked up immediately. An optional
//! [`CachedKeySet`] wrapper trades that for latency with a TTL.
//!
//! # Security
//!
//! - Requests are bounded by an explicit timeout
//! - Redirects are not followed
//! - HTTPS should be used in production (enforced by deployment config)

use crate::errors::FetchError;
use crate::observability::metrics;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// JSON Web Key as published in the key set.
///
/// Only `kid` and the first `x5c` entry are used for verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JsonWebKey {
    /// Key type (e.g. "RSA").
    #[serde(default)]
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: String,

    /// Key use (e.g. "sig").
    #[serde(default, rename = "use")]
    pub key_use: String,

    /// RSA modulus (base64url). Unused: keys are taken from the certificate.
    #[serde(default)]
    pub n: String,

    /// RSA exponent (base64url). Unused: keys are taken from the certificate.
    #[serde(default)]
    pub e: String,

    /// X.509 certificate chain, leaf first, each entry standard base64 DER.
    #[serde(default)]
    pub x5c: Vec<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JsonWebKeySet {
    /// List of JSON Web Keys, in published order.
    pub keys: Vec<JsonWebKey>,
}

/// Anything that can produce the current key set.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Return the key set to verify the current request against.
    async fn key_set(&self) -> Result<Arc<JsonWebKeySet>, FetchError>;
}

/// Fetches the JWKS document over HTTP on every call.
pub struct JwksFetcher {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,
}

impl JwksFetcher {
    /// Create a new JWKS fetcher.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL to the identity provider's JWKS endpoint
    /// * `timeout` - Upper bound for one fetch, connect through body read
    pub fn new(jwks_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "api.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
        }
    }

    /// Fetch and decode the key set.
    ///
    /// # Errors
    ///
    /// - `FetchError::Request` if the request fails or times out
    /// - `FetchError::Status` if the endpoint answers with a non-2xx status
    /// - `FetchError::Decode` if the body is not a valid JWKS document
    #[instrument(skip_all, name = "api.auth.jwks.fetch")]
    pub async fn fetch(&self) -> Result<JsonWebKeySet, FetchError> {
        let start = Instant::now();
        let result = self.fetch_document().await;

        let status = match &result {
            Ok(_) => "success",
            Err(FetchError::Request(_)) => "request_error",
            Err(FetchError::Status(_)) => "http_error",
            Err(FetchError::Decode(_)) => "decode_error",
        };
        metrics::record_jwks_fetch(status, start.elapsed());

        result
    }

    async fn fetch_document(&self) -> Result<JsonWebKeySet, FetchError> {
        tracing::debug!(target: "api.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "api.auth.jwks", error = %e, "Failed to fetch JWKS");
                FetchError::Request(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "api.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(FetchError::Status(response.status().as_u16()));
        }

        // Reading the body to the end releases the connection back to the pool
        let body = response.bytes().await.map_err(|e| {
            tracing::error!(target: "api.auth.jwks", error = %e, "Failed to read JWKS response body");
            FetchError::Request(e.to_string())
        })?;

        let jwks: JsonWebKeySet = serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(target: "api.auth.jwks", error = %e, "Failed to parse JWKS response");
            FetchError::Decode(e.to_string())
        })?;

        tracing::debug!(
            target: "api.auth.jwks",
            key_count = jwks.keys.len(),
            "JWKS fetched"
        );

        Ok(jwks)
    }
}

#[async_trait]
impl KeySetSource for JwksFetcher {
    async fn key_set(&self) -> Result<Arc<JsonWebKeySet>, FetchError> {
        self.fetch().await.map(Arc::new)
    }
}

/// Cached JWKS data with expiry time.
struct CachedJwks {
    keys: Arc<JsonWebKeySet>,
    expires_at: Instant,
}

/// Read-through TTL cache in front of another key source.
///
/// Concurrent misses are collapsed into a single upstream fetch: the first
/// caller refreshes while the others wait on the refresh guard and then read
/// the fresh entry. Failed fetches are not cached.
pub struct CachedKeySet<S> {
    source: S,
    cache: RwLock<Option<CachedJwks>>,
    refresh_guard: Mutex<()>,
    ttl: Duration,
}

impl<S: KeySetSource> CachedKeySet<S> {
    /// Wrap `source` with a cache that keeps a fetched key set for `ttl`.
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
            refresh_guard: Mutex::new(()),
            ttl,
        }
    }

    async fn cached(&self) -> Option<Arc<JsonWebKeySet>> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|cached| cached.expires_at > Instant::now())
            .map(|cached| Arc::clone(&cached.keys))
    }
}

#[async_trait]
impl<S: KeySetSource> KeySetSource for CachedKeySet<S> {
    async fn key_set(&self) -> Result<Arc<JsonWebKeySet>, FetchError> {
        if let Some(keys) = self.cached().await {
            tracing::debug!(target: "api.auth.jwks", "JWKS cache hit");
            return Ok(keys);
        }

        let _refresh = self.refresh_guard.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(keys) = self.cached().await {
            return Ok(keys);
        }

        let keys = self.source.key_set().await?;

        let Some(expires_at) = Instant::now().checked_add(self.ttl) else {
            tracing::warn!(
                target: "api.auth.jwks",
                ttl_secs = self.ttl.as_secs(),
                "JWKS cache TTL out of range, not caching"
            );
            return Ok(keys);
        };

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys: Arc::clone(&keys),
            expires_at,
        });

        tracing::info!(
            target: "api.auth.jwks",
            key_count = keys.keys.len(),
            "JWKS cache refreshed"
        );

        Ok(keys)
    }
}

/// Build the key source for the configured fetch timeout and cache TTL.
///
/// A zero TTL yields a plain fetcher that hits the endpoint on every call.
pub fn build_key_source(
    jwks_url: String,
    timeout: Duration,
    cache_ttl: Duration,
) -> Arc<dyn KeySetSource> {
    let fetcher = JwksFetcher::new(jwks_url, timeout);
    if cache_ttl.is_zero() {
        Arc::new(fetcher)
    } else {
        Arc::new(CachedKeySet::new(fetcher, cache_ttl))
    }
}
