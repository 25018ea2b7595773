//! Liveness probe handler.

/// Handler for GET /health
///
/// Returns plain `OK`. Does not depend on the identity provider being
/// reachable, so an outage there does not get the pod restarted.
#[tracing::instrument(skip_all, name = "api.health.check")]
pub async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_returns_ok() {
        assert_eq!(health_check().await, "OK");
    }
}
