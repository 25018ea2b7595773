//! Authentication error types.
//!
//! Every verification failure is request-scoped: it rejects the offending
//! request with 401 Unauthorized and never takes the process down.
//! Messages returned to clients are fixed per error category. The detailed
//! cause is logged server-side.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client-visible message for failures that must not reveal which step failed.
pub const INVALID_ACCESS_TOKEN: &str = "Invalid access token";

/// Client-visible message when no token was supplied.
pub const TOKEN_NOT_FOUND: &str = "Required authorization token not found";

/// Client-visible message for a non-Bearer Authorization header.
pub const INVALID_HEADER_FORMAT: &str = "Authorization header format must be Bearer {token}";

/// Client-visible message for audience failures.
pub const INVALID_AUDIENCE: &str = "Invalid audience";

/// Client-visible message for issuer failures.
pub const INVALID_ISSUER: &str = "Invalid issuer";

/// Failure to obtain the key set from the JWKS endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("JWKS request failed: {0}")]
    Request(String),

    #[error("JWKS endpoint returned status {0}")]
    Status(u16),

    #[error("JWKS document could not be decoded: {0}")]
    Decode(String),
}

/// Failure to turn a token's `kid` into a usable public key.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Unable to find appropriate key")]
    NoMatchingKey,

    #[error("Failed to parse RSA public key from PEM certificate")]
    MalformedCertificate,
}

/// Reasons a bearer token is rejected.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingToken,

    #[error("Invalid Authorization header format")]
    InvalidAuthorizationHeader,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Unsupported signing algorithm")]
    UnsupportedAlgorithm,

    #[error("No audience claim")]
    MissingAudience,

    #[error("Invalid audience")]
    InvalidAudience,

    #[error("Invalid issuer")]
    InvalidIssuer,

    #[error("Key set unavailable: {0}")]
    KeySetUnavailable(#[from] FetchError),

    #[error("Key resolution failed: {0}")]
    KeyResolutionFailed(#[from] ResolutionError),

    #[error("Token verification failed: {0}")]
    VerificationFailed(String),
}

impl AuthError {
    /// HTTP status code for this error. Always in the unauthorized range.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    /// Stable, bounded label used for metrics and logs.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidAuthorizationHeader => "invalid_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnsupportedAlgorithm => "unsupported_algorithm",
            AuthError::MissingAudience => "missing_audience",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
            AuthError::KeyResolutionFailed(ResolutionError::NoMatchingKey) => "no_matching_key",
            AuthError::KeyResolutionFailed(ResolutionError::MalformedCertificate) => {
                "malformed_certificate"
            }
            AuthError::VerificationFailed(_) => "verification_failed",
        }
    }

    /// Message placed in the response body.
    ///
    /// Claim-level failures keep the wording existing clients already match
    /// on. Everything past the claim gates collapses into one message so the
    /// response does not reveal key-set or signature internals.
    pub fn client_message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => TOKEN_NOT_FOUND,
            AuthError::InvalidAuthorizationHeader => INVALID_HEADER_FORMAT,
            AuthError::MissingAudience | AuthError::InvalidAudience => INVALID_AUDIENCE,
            AuthError::InvalidIssuer => INVALID_ISSUER,
            AuthError::MalformedToken
            | AuthError::UnsupportedAlgorithm
            | AuthError::KeySetUnavailable(_)
            | AuthError::KeyResolutionFailed(_)
            | AuthError::VerificationFailed(_) => INVALID_ACCESS_TOKEN,
        }
    }
}

/// JSON body with a single `Message` field.
///
/// Used for rejections and for plain informational responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(rename = "Message")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::KeySetUnavailable(err) => {
                tracing::warn!(target: "api.auth", error = %err, "Rejecting request: key set unavailable");
            }
            other => {
                tracing::debug!(target: "api.auth", code = other.code(), error = %other, "Rejecting request");
            }
        }

        let status = self.status_code();
        let mut response =
            (status, Json(MessageResponse::new(self.client_message()))).into_response();

        if let Ok(header_value) = "Bearer realm=\"intouch-api\", error=\"invalid_token\"".parse() {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, header_value);
        }

        response
    }
}
