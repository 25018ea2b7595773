//! API server configuration.
//!
//! Configuration is loaded from environment variables. Verification settings
//! are validated at startup so that a misconfigured verifier never serves a
//! request.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default JWKS fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum JWKS fetch timeout.
pub const MAX_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum JWKS cache TTL.
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(86400);

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Settings for verifying bearer tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    /// Expected `iss` claim, compared byte-for-byte.
    pub issuer: String,

    /// Audience that must appear in the token's `aud` array.
    pub audience: String,

    /// URL of the identity provider's JWKS document.
    pub jwks_url: String,

    /// The only accepted signing algorithm.
    pub algorithm: Algorithm,

    /// Leeway applied to `exp` and `nbf`.
    pub clock_skew: Duration,

    /// Upper bound for one JWKS fetch.
    pub fetch_timeout: Duration,

    /// Key-set cache lifetime. Zero fetches on every verification.
    pub cache_ttl: Duration,
}

/// Whether protected routes verify tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSettings {
    /// Every protected request must carry a valid bearer token.
    Enforce(VerifierSettings),

    /// Protected routes accept every request. Local development only.
    Disabled,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Token verification mode and settings.
    pub auth: AuthSettings,

    /// Seconds to keep draining in-flight requests after a shutdown signal.
    pub drain_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid AUTH_MODE: expected 'enforce' or 'disabled', got '{0}'")]
    InvalidAuthMode(String),

    #[error("Unsupported JWT_ALGORITHM: only RS256 is accepted, got '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidFetchTimeout(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidCacheTtl(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainSeconds(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let auth = match vars.get("AUTH_MODE").map(|s| s.trim().to_ascii_lowercase()) {
            None => AuthSettings::Enforce(VerifierSettings::from_vars(vars)?),
            Some(mode) if mode == "enforce" => {
                AuthSettings::Enforce(VerifierSettings::from_vars(vars)?)
            }
            Some(mode) if mode == "disabled" => AuthSettings::Disabled,
            Some(mode) => return Err(ConfigError::InvalidAuthMode(mode)),
        };

        let drain_seconds = match vars.get("API_DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "API_DRAIN_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?,
            None => DEFAULT_DRAIN_SECONDS,
        };

        Ok(Config {
            bind_address,
            auth,
            drain_seconds,
        })
    }
}

impl VerifierSettings {
    /// Load verifier settings from a HashMap.
    ///
    /// `AUTH_ISSUER`, `AUTH_AUDIENCE` and `AUTH_JWKS_URL` are required.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let issuer = required(vars, "AUTH_ISSUER")?;
        let audience = required(vars, "AUTH_AUDIENCE")?;
        let jwks_url = required(vars, "AUTH_JWKS_URL")?;

        let algorithm = match vars.get("JWT_ALGORITHM").map(|s| s.trim()) {
            None | Some("RS256") => Algorithm::RS256,
            Some(other) => return Err(ConfigError::UnsupportedAlgorithm(other.to_string())),
        };

        let clock_skew = bounded_seconds(
            vars,
            "JWT_CLOCK_SKEW_SECONDS",
            DEFAULT_CLOCK_SKEW,
            MAX_CLOCK_SKEW,
            ConfigError::InvalidJwtClockSkew,
        )?;

        let fetch_timeout = bounded_seconds(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_FETCH_TIMEOUT,
            MAX_FETCH_TIMEOUT,
            ConfigError::InvalidFetchTimeout,
        )?;

        let cache_ttl = match vars.get("JWKS_CACHE_TTL_SECONDS") {
            Some(value_str) => {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidCacheTtl(format!(
                        "JWKS_CACHE_TTL_SECONDS must be a valid non-negative integer, got '{}': {}",
                        value_str, e
                    ))
                })?;
                if value > MAX_CACHE_TTL.as_secs() {
                    return Err(ConfigError::InvalidCacheTtl(format!(
                        "JWKS_CACHE_TTL_SECONDS must not exceed {} seconds, got {}",
                        MAX_CACHE_TTL.as_secs(),
                        value
                    )));
                }
                Duration::from_secs(value)
            }
            None => Duration::ZERO,
        };

        Ok(VerifierSettings {
            issuer,
            audience,
            jwks_url,
            algorithm,
            clock_skew,
            fetch_timeout,
            cache_ttl,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// Parse a whole number of seconds in `1..=max`, or fall back to `default`.
fn bounded_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: Duration,
    max: Duration,
    invalid: fn(String) -> ConfigError,
) -> Result<Duration, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: i64 = value_str.parse().map_err(|e| {
        invalid(format!(
            "{} must be a valid integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value <= 0 {
        return Err(invalid(format!("{} must be positive, got {}", name, value)));
    }

    let value = value.unsigned_abs();
    if value > max.as_secs() {
        return Err(invalid(format!(
            "{} must not exceed {} seconds, got {}",
            name,
            max.as_secs(),
            value
        )));
    }

    Ok(Duration::from_secs(value))
}
