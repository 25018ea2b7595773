//! Operational endpoint integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use api_test_utils::{TestApiServer, TestClaimsBuilder, TestSigningKey};
use reqwest::StatusCode;

#[tokio::test]
async fn test_health_returns_ok() -> Result<()> {
    let server = TestApiServer::spawn().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_health_does_not_touch_jwks() -> Result<()> {
    let server = TestApiServer::spawn().await?;

    reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(server.jwks_request_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_reports_verifications() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let token = TestSigningKey::primary().sign(&TestClaimsBuilder::new().build());

    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/me", server.url()))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.text().await?;
    assert!(
        body.contains("api_token_verifications_total"),
        "missing verification counter in:\n{}",
        body
    );
    assert!(
        body.contains("api_jwks_fetch_total"),
        "missing fetch counter in:\n{}",
        body
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_not_found() -> Result<()> {
    let server = TestApiServer::spawn().await?;

    let response = reqwest::get(format!("{}/api/v1/nope", server.url())).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
