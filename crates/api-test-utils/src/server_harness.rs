//! Test server harness for E2E testing
//!
//! Provides `TestApiServer` for spawning real API server instances in tests,
//! backed by a `wiremock` server standing in for the identity provider's JWKS
//! endpoint.

use crate::crypto_fixtures::{jwks_json, TestSigningKey};
use crate::token_builders::{TEST_AUDIENCE, TEST_ISSUER};
use api_server::config::Config;
use api_server::middleware::AuthState;
use api_server::observability::metrics::init_metrics_recorder;
use api_server::routes;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mocked identity provider serves its key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Global metrics handle for test servers
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Get the process-wide metrics handle, installing the recorder on first use.
///
/// Falls back to a detached recorder if another one is already installed.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Configuration variables for a test server that enforces authentication
/// against `jwks_url`.
pub fn enforce_vars(jwks_url: &str) -> HashMap<String, String> {
    HashMap::from([
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("AUTH_MODE".to_string(), "enforce".to_string()),
        ("AUTH_ISSUER".to_string(), TEST_ISSUER.to_string()),
        ("AUTH_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
        ("AUTH_JWKS_URL".to_string(), jwks_url.to_string()),
        ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ("API_DRAIN_SECONDS".to_string(), "0".to_string()),
    ])
}

/// Test harness for spawning the API server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<()> {
///     let server = TestApiServer::spawn().await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestApiServer {
    addr: SocketAddr,
    config: Config,
    jwks_server: Option<MockServer>,
    _handle: JoinHandle<()>,
}

impl TestApiServer {
    /// Spawn a server whose identity provider publishes the primary key.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_keys(&[TestSigningKey::primary()]).await
    }

    /// Spawn a server whose identity provider publishes `keys`.
    pub async fn spawn_with_keys(keys: &[TestSigningKey]) -> Result<Self, anyhow::Error> {
        Self::spawn_with_jwks_response(
            ResponseTemplate::new(200).set_body_json(jwks_json(keys)),
            HashMap::new(),
        )
        .await
    }

    /// Spawn a server whose JWKS endpoint answers with `response`.
    ///
    /// `overrides` are applied on top of [`enforce_vars`].
    pub async fn spawn_with_jwks_response(
        response: ResponseTemplate,
        overrides: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let jwks_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&jwks_server)
            .await;

        let mut vars = enforce_vars(&format!("{}{}", jwks_server.uri(), JWKS_PATH));
        vars.extend(overrides);

        let mut server = Self::spawn_with_vars(vars).await?;
        server.jwks_server = Some(jwks_server);
        Ok(server)
    }

    /// Spawn a server in bypass mode. No JWKS endpoint is involved.
    pub async fn spawn_bypass() -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("AUTH_MODE".to_string(), "disabled".to_string()),
        ]);
        Self::spawn_with_vars(vars).await
    }

    /// Spawn a server from raw configuration variables.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_vars(vars: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let auth_state = Arc::new(AuthState::from_settings(&config.auth));

        // Build routes using api-server's real route builder
        let app = routes::build_routes(auth_state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            jwks_server: None,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The mocked JWKS server, if this server was spawned with one.
    pub fn jwks_server(&self) -> Option<&MockServer> {
        self.jwks_server.as_ref()
    }

    /// Number of requests the JWKS endpoint has received so far.
    pub async fn jwks_request_count(&self) -> usize {
        match &self.jwks_server {
            Some(server) => server
                .received_requests()
                .await
                .map(|requests| requests.len())
                .unwrap_or(0),
            None => 0,
        }
    }

    /// Replace the published key set, as an identity provider does on rotation.
    pub async fn publish_keys(&self, keys: &[TestSigningKey]) {
        let server = self
            .jwks_server
            .as_ref()
            .expect("publish_keys requires a server spawned with a JWKS mock");

        server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json(keys)))
            .mount(server)
            .await;
    }
}

impl Drop for TestApiServer {
    fn drop(&mut self) {
        // Explicitly abort the HTTP server task to ensure immediate cleanup
        // when the test completes.
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_server::config::AuthSettings;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestApiServer::spawn().await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[tokio::test]
    async fn test_server_provides_addr() -> Result<(), anyhow::Error> {
        let server = TestApiServer::spawn_bypass().await?;

        let addr = server.addr();
        assert!(addr.ip().is_loopback());
        assert!(addr.port() > 0);
        assert_eq!(server.url(), format!("http://{}", addr));
        assert!(server.jwks_server().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_config_points_at_jwks_mock() -> Result<(), anyhow::Error> {
        let server = TestApiServer::spawn().await?;
        let jwks_server = server.jwks_server().expect("spawn mounts a JWKS mock");

        match &server.config().auth {
            AuthSettings::Enforce(settings) => {
                assert_eq!(settings.issuer, TEST_ISSUER);
                assert_eq!(settings.audience, TEST_AUDIENCE);
                assert_eq!(
                    settings.jwks_url,
                    format!("{}{}", jwks_server.uri(), JWKS_PATH)
                );
            }
            AuthSettings::Disabled => panic!("spawn should enforce authentication"),
        }

        let bypass = TestApiServer::spawn_bypass().await?;
        assert_eq!(bypass.config().auth, AuthSettings::Disabled);

        Ok(())
    }

    #[tokio::test]
    async fn test_jwks_request_count_starts_at_zero() -> Result<(), anyhow::Error> {
        let server = TestApiServer::spawn().await?;
        assert_eq!(server.jwks_request_count().await, 0);
        Ok(())
    }
}
