//! Authentication middleware for protected routes.
//!
//! Extracts the Bearer token from the Authorization header, verifies it with
//! the [`TokenVerifier`], and injects the verified token into request
//! extensions. In bypass mode every request is forwarded untouched.

use crate::auth::TokenVerifier;
use crate::config::AuthSettings;
use crate::errors::AuthError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub enum AuthState {
    /// Verify every request with the given verifier.
    Enforce(Arc<TokenVerifier>),

    /// Forward every request without looking at its credentials.
    Bypass,
}

impl AuthState {
    /// Build the middleware state for the configured auth mode.
    pub fn from_settings(settings: &AuthSettings) -> Self {
        match settings {
            AuthSettings::Enforce(verifier) => {
                AuthState::Enforce(Arc::new(TokenVerifier::from_settings(verifier)))
            }
            AuthSettings::Disabled => AuthState::Bypass,
        }
    }

    /// Whether requests are forwarded without verification.
    pub fn is_bypass(&self) -> bool {
        matches!(self, AuthState::Bypass)
    }
}

/// Authentication middleware that verifies bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// The scheme is matched case-insensitively.
///
/// # Response
///
/// - Returns 401 Unauthorized with a `{"Message": ...}` body and a
///   WWW-Authenticate header if the token is missing or invalid
/// - Continues to the next handler with the verified token in extensions
#[instrument(skip_all, name = "api.middleware.auth")]
pub async fn authenticate(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let verifier = match state.as_ref() {
        AuthState::Bypass => return Ok(next.run(req).await),
        AuthState::Enforce(verifier) => verifier,
    };

    let token = extract_bearer_token(req.headers())?;

    let verified = verifier.verify(token).await?;

    // Store the verified token for downstream handlers
    req.extensions_mut().insert(verified);

    Ok(next.run(req).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// # Errors
///
/// - `AuthError::MissingToken` - no Authorization header, or an empty one
/// - `AuthError::InvalidAuthorizationHeader` - any other scheme, or not
///   exactly two space-separated parts
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        tracing::debug!(target: "api.middleware.auth", "Missing Authorization header");
        return Err(AuthError::MissingToken);
    };

    if value.is_empty() {
        tracing::debug!(target: "api.middleware.auth", "Empty Authorization header");
        return Err(AuthError::MissingToken);
    }

    let value = value.to_str().map_err(|_| {
        tracing::debug!(target: "api.middleware.auth", "Non-ASCII Authorization header");
        AuthError::InvalidAuthorizationHeader
    })?;

    match value.split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("bearer")
                && !token.is_empty()
                && !token.contains(' ') =>
        {
            Ok(token)
        }
        _ => {
            tracing::debug!(target: "api.middleware.auth", "Invalid Authorization header format");
            Err(AuthError::InvalidAuthorizationHeader)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &'static [u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_auth_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AuthState>();
    }

    #[test]
    fn test_from_settings_disabled_is_bypass() {
        assert!(AuthState::from_settings(&AuthSettings::Disabled).is_bypass());
    }

    #[test]
    fn test_extract_bearer_token() {
        let headers = headers_with(b"Bearer abc.def.ghi");
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_extract_scheme_is_case_insensitive() {
        for value in [&b"bearer abc"[..], b"BEARER abc", b"BeArEr abc"] {
            let mut headers = HeaderMap::new();
            headers.insert(
                header::AUTHORIZATION,
                HeaderValue::from_bytes(value).unwrap(),
            );
            assert_eq!(extract_bearer_token(&headers).unwrap(), "abc");
        }
    }

    #[test]
    fn test_extract_missing_header() {
        let headers = HeaderMap::new();
        let result = extract_bearer_token(&headers);
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[test]
    fn test_extract_empty_header() {
        let headers = headers_with(b"");
        let result = extract_bearer_token(&headers);
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[test]
    fn test_extract_other_scheme() {
        let headers = headers_with(b"Basic dXNlcjpwYXNz");
        let result = extract_bearer_token(&headers);
        assert!(matches!(result, Err(AuthError::InvalidAuthorizationHeader)));
    }

    #[test]
    fn test_extract_scheme_without_token() {
        for value in [&b"Bearer"[..], b"Bearer "] {
            let mut headers = HeaderMap::new();
            headers.insert(
                header::AUTHORIZATION,
                HeaderValue::from_bytes(value).unwrap(),
            );
            let result = extract_bearer_token(&headers);
            assert!(matches!(result, Err(AuthError::InvalidAuthorizationHeader)));
        }
    }

    #[test]
    fn test_extract_too_many_parts() {
        let headers = headers_with(b"Bearer abc def");
        let result = extract_bearer_token(&headers);
        assert!(matches!(result, Err(AuthError::InvalidAuthorizationHeader)));
    }

    #[test]
    fn test_extract_token_without_scheme() {
        let headers = headers_with(b"abc.def.ghi");
        let result = extract_bearer_token(&headers);
        assert!(matches!(result, Err(AuthError::InvalidAuthorizationHeader)));
    }

    #[test]
    fn test_extract_non_ascii_header() {
        let headers = headers_with(b"Bearer \xff\xfe");
        let result = extract_bearer_token(&headers);
        assert!(matches!(result, Err(AuthError::InvalidAuthorizationHeader)));
    }
}
