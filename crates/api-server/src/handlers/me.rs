//! Current caller handler.
//!
//! Returns who the caller is according to the verified bearer token.

use crate::auth::VerifiedToken;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Response for `/api/v1/me` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeResponse {
    /// False when the request was let through by bypass mode.
    pub authenticated: bool,

    /// Subject of the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Issuer of the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audiences of the token.
    #[serde(default)]
    pub aud: Vec<String>,
}

impl MeResponse {
    fn anonymous() -> Self {
        Self {
            authenticated: false,
            sub: None,
            iss: None,
            aud: Vec::new(),
        }
    }
}

impl From<&VerifiedToken> for MeResponse {
    fn from(token: &VerifiedToken) -> Self {
        Self {
            authenticated: true,
            sub: token.subject().map(str::to_string),
            iss: token.issuer().map(str::to_string),
            aud: token.audiences().into_iter().map(str::to_string).collect(),
        }
    }
}

/// Handler for GET /api/v1/me
///
/// ## Response
///
/// Returns 200 OK with the caller's identity:
///
/// ```json
/// {
///   "authenticated": true,
///   "sub": "auth0|5f7c8ec7c33c6c004bbafe82",
///   "iss": "https://intouch.eu.auth0.com/",
///   "aud": ["https://api.intouch.example"]
/// }
/// ```
#[instrument(skip_all, name = "api.handlers.me")]
pub async fn get_me(token: Option<Extension<VerifiedToken>>) -> Json<MeResponse> {
    match token {
        Some(Extension(token)) => Json(MeResponse::from(&token)),
        None => {
            tracing::debug!(target: "api.handlers.me", "No verified token, returning anonymous caller");
            Json(MeResponse::anonymous())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_me_response_serialization() {
        let response = MeResponse {
            authenticated: true,
            sub: Some("user123".to_string()),
            iss: Some("https://issuer.example.com/".to_string()),
            aud: vec!["https://api.example.com".to_string()],
        };

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["authenticated"], true);
        assert_eq!(json["sub"], "user123");
        assert_eq!(json["iss"], "https://issuer.example.com/");
        assert_eq!(json["aud"], serde_json::json!(["https://api.example.com"]));
    }

    #[test]
    fn test_anonymous_omits_identity() {
        let json = serde_json::to_string(&MeResponse::anonymous()).unwrap();

        assert!(json.contains("\"authenticated\":false"));
        assert!(!json.contains("sub"), "sub should be omitted when None");
        assert!(!json.contains("iss"), "iss should be omitted when None");
    }

    #[tokio::test]
    async fn test_get_me_without_token_is_anonymous() {
        let Json(response) = get_me(None).await;
        assert_eq!(response, MeResponse::anonymous());
    }
}
