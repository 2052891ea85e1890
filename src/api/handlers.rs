//! Shared application state and service-level handlers.

use std::sync::Arc;

use axum::{Json, http::StatusCode};

use crate::infrastructure::{UpstreamClient, UpstreamConfig};

// =============================================================================
// Application State
// =============================================================================

/// Shared application dependencies.
///
/// The upstream client is a trait object so the server runs with `reqwest`
/// while tests inject a stub.
#[derive(Clone)]
pub struct AppState {
    /// Client used for every upstream call.
    pub upstream: Arc<dyn UpstreamClient>,
    /// Upstream locations and request settings.
    pub config: Arc<UpstreamConfig>,
}

impl AppState {
    /// Creates a new `AppState`.
    #[must_use]
    pub fn new(upstream: Arc<dyn UpstreamClient>, config: UpstreamConfig) -> Self {
        Self {
            upstream,
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// GET /health Handler
// =============================================================================

/// Health check response body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Health check endpoint.
///
/// ```json
/// { "status": "healthy", "version": "0.1.0" }
/// ```
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// =============================================================================
// OPTIONS Handler
// =============================================================================

/// Answers CORS preflight requests with 200 and an empty body.
///
/// The `Access-Control-*` headers are added by the route layers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn test_health_check() {
        let Json(response) = health_check().await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_preflight_is_ok() {
        assert_eq!(preflight().await, StatusCode::OK);
    }
}
