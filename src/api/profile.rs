//! `GET /api/profiles/{username}`: relays one profile from upstream.
//!
//! # Response
//!
//! - **200 OK**: upstream profile JSON, unchanged
//! - **400 Bad Request**: `{"error": "Username is required"}`, or the path
//!   segment is not valid UTF-8
//! - **404 Not Found**: `{"error": "User not found"}`
//! - **500 Internal Server Error**: `{"error": "Failed to fetch user data"}`
//! - **504 Gateway Timeout**: upstream did not answer in time

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
    http::{HeaderValue, StatusCode, header},
};
use serde_json::Value;
use thiserror::Error;

use super::error::ApiErrorResponse;
use super::handlers::AppState;
use crate::domain::normalize::truncate;
use crate::infrastructure::{TransportError, UpstreamClient, UpstreamConfig, UpstreamRequest};

const LOGGED_BODY_LIMIT: usize = 500;

// =============================================================================
// Profile Proxy Error
// =============================================================================

/// Failures of the profile proxy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileProxyError {
    /// The path carried no username.
    #[error("Username is required")]
    MissingUsername,

    /// Upstream answered 404.
    #[error("User not found")]
    NotFound,

    /// `API_URL_GENOME` is not configured.
    #[error("API_URL_GENOME environment variable is not defined")]
    NotConfigured,

    /// Upstream answered with a non-2xx status other than 404.
    #[error("Upstream profile API responded with status: {0}")]
    UpstreamStatus(u16),

    /// Upstream answered 2xx with a body that is not JSON.
    #[error("Upstream profile body is not valid JSON: {0}")]
    InvalidBody(String),

    /// Upstream could not be reached or its body could not be read.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// =============================================================================
// GET /api/profiles/{username} Handler
// =============================================================================

/// Profile proxy endpoint.
///
/// # Errors
///
/// Returns [`ApiErrorResponse`] as described in the module documentation.
pub async fn get_profile(
    State(state): State<AppState>,
    username: Result<Path<String>, PathRejection>,
) -> Result<Json<Value>, ApiErrorResponse> {
    let Path(username) = username
        .inspect_err(|rejection| tracing::info!(%rejection, "Rejecting profile request"))?;
    tracing::info!(%username, "Profile request received");

    let profile = fetch_profile(state.upstream.as_ref(), &state.config, &username)
        .await
        .inspect_err(|error| match error {
            ProfileProxyError::MissingUsername | ProfileProxyError::NotFound => {
                tracing::info!(%username, %error, "Profile request rejected");
            }
            _ => tracing::error!(%username, %error, "Profile proxy failed"),
        })?;

    Ok(Json(profile))
}

/// Handles `/api/profiles/` with an empty username segment.
pub async fn get_profile_without_username() -> ApiErrorResponse {
    ProfileProxyError::MissingUsername.into()
}

/// Fetches the profile of `username` from the configured base URL.
///
/// # Errors
///
/// Returns [`ProfileProxyError::NotFound`] when upstream answers 404 and the
/// other variants of [`ProfileProxyError`] for every other failure.
pub async fn fetch_profile(
    upstream: &dyn UpstreamClient,
    config: &UpstreamConfig,
    username: &str,
) -> Result<Value, ProfileProxyError> {
    if username.is_empty() {
        return Err(ProfileProxyError::MissingUsername);
    }
    let base = config
        .profile_base_url
        .as_deref()
        .ok_or(ProfileProxyError::NotConfigured)?;

    let url = profile_url(base, username);
    tracing::debug!(%url, client = upstream.client_name(), "Fetching profile upstream");

    let request = UpstreamRequest::get(url)
        .with_header(header::ACCEPT, HeaderValue::from_static("application/json"));
    let response = upstream.send(request).await?;

    if response.status == StatusCode::NOT_FOUND {
        return Err(ProfileProxyError::NotFound);
    }
    if !response.status.is_success() {
        if let Ok(text) = &response.body {
            tracing::error!(
                status = response.status.as_u16(),
                body = %truncate(text, LOGGED_BODY_LIMIT),
                "Upstream profile error response"
            );
        }
        return Err(ProfileProxyError::UpstreamStatus(response.status.as_u16()));
    }

    let text = response.body?;
    serde_json::from_str(&text).map_err(|error| ProfileProxyError::InvalidBody(error.to_string()))
}

/// Joins the base URL and the percent-encoded username.
///
/// A `/` is inserted only when the base does not already end with one.
#[must_use]
pub fn profile_url(base: &str, username: &str) -> String {
    let encoded = urlencoding::encode(username);
    if base.ends_with('/') {
        format!("{base}{encoded}")
    } else {
        format!("{base}/{encoded}")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::StubUpstreamClient;
    use axum::http::Method;
    use rstest::rstest;
    use serde_json::json;

    fn configured() -> UpstreamConfig {
        UpstreamConfig::default().with_profile_base_url("https://upstream.test/genome/bios/")
    }

    #[rstest]
    #[case("https://u.test/bios/", "juamez", "https://u.test/bios/juamez")]
    #[case("https://u.test/bios", "juamez", "https://u.test/bios/juamez")]
    #[case("https://u.test/bios/", "ana maria", "https://u.test/bios/ana%20maria")]
    #[case("https://u.test/bios/", "a/b?c", "https://u.test/bios/a%2Fb%3Fc")]
    fn test_profile_url(#[case] base: &str, #[case] username: &str, #[case] expected: &str) {
        assert_eq!(profile_url(base, username), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn test_fetch_profile_relays_json() {
        let stub = StubUpstreamClient::with_response(
            StatusCode::OK,
            r#"{"person":{"name":"Juan Perez","publicId":"juamez"}}"#,
        );

        let profile = fetch_profile(&stub, &configured(), "juamez").await.unwrap();

        assert_eq!(
            profile,
            json!({"person": {"name": "Juan Perez", "publicId": "juamez"}})
        );
        let request = &stub.requests()[0];
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, "https://upstream.test/genome/bios/juamez");
        assert_eq!(request.headers.get(header::ACCEPT).unwrap(), "application/json");
    }

    #[rstest]
    #[tokio::test]
    async fn test_fetch_profile_not_found() {
        let stub = StubUpstreamClient::with_response(StatusCode::NOT_FOUND, "{}");
        let result = fetch_profile(&stub, &configured(), "ghost").await;
        assert_eq!(result, Err(ProfileProxyError::NotFound));
    }

    #[rstest]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, 500)]
    #[case(StatusCode::FORBIDDEN, 403)]
    #[tokio::test]
    async fn test_fetch_profile_error_status(#[case] status: StatusCode, #[case] code: u16) {
        let stub = StubUpstreamClient::with_response(status, "nope");
        let result = fetch_profile(&stub, &configured(), "juamez").await;
        assert_eq!(result, Err(ProfileProxyError::UpstreamStatus(code)));
    }

    #[rstest]
    #[tokio::test]
    async fn test_fetch_profile_invalid_json() {
        let stub = StubUpstreamClient::with_response(StatusCode::OK, "<html>");
        let result = fetch_profile(&stub, &configured(), "juamez").await;
        assert!(matches!(result, Err(ProfileProxyError::InvalidBody(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_fetch_profile_timeout() {
        let stub = StubUpstreamClient::with_error(TransportError::Timeout(10_000));
        let result = fetch_profile(&stub, &configured(), "juamez").await;
        assert_eq!(
            result,
            Err(ProfileProxyError::Transport(TransportError::Timeout(10_000)))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_fetch_profile_empty_username_skips_network() {
        let stub = StubUpstreamClient::with_response(StatusCode::OK, "{}");
        let result = fetch_profile(&stub, &configured(), "").await;
        assert_eq!(result, Err(ProfileProxyError::MissingUsername));
        assert_eq!(stub.request_count(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_fetch_profile_not_configured() {
        let stub = StubUpstreamClient::with_response(StatusCode::OK, "{}");
        let result = fetch_profile(&stub, &UpstreamConfig::default(), "juamez").await;
        assert_eq!(result, Err(ProfileProxyError::NotConfigured));
        assert_eq!(stub.request_count(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_get_profile_without_username_is_bad_request() {
        let response = get_profile_without_username().await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error.error, "Username is required");
    }
}
