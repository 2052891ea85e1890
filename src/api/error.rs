//! API error handling.
//!
//! Every failure leaves the service as a JSON body of the form
//! `{"error": "<message>"}` with an appropriate status code.

use std::any::Any;

use axum::{
    Json,
    extract::rejection::{BytesRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::profile::ProfileProxyError;
use super::search::SearchProxyError;
use crate::infrastructure::TransportError;

/// Message returned for every profile failure that is not a 400, 404 or 504.
pub const PROFILE_FAILURE_MESSAGE: &str = "Failed to fetch user data";

/// Message returned when the profile upstream times out.
pub const PROFILE_TIMEOUT_MESSAGE: &str = "Request timeout - upstream profile API is not responding";

// =============================================================================
// API Error
// =============================================================================

/// API error structure for JSON responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable error message.
    pub error: String,
}

impl ApiError {
    /// Creates a new API error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

// =============================================================================
// API Error Response
// =============================================================================

/// API error response containing status code and error details.
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Error details.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// Creates a new API error response.
    #[must_use]
    pub const fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }

    /// Creates a 400 Bad Request response.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiError::new(message))
    }

    /// Creates a 404 Not Found response.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiError::new(message))
    }

    /// Creates a 500 Internal Server Error response.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ApiError::new(message))
    }

    /// Creates a 504 Gateway Timeout response.
    #[must_use]
    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, ApiError::new(message))
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<SearchProxyError> for ApiErrorResponse {
    fn from(error: SearchProxyError) -> Self {
        match error {
            SearchProxyError::MissingQuery => Self::bad_request(error.to_string()),
            SearchProxyError::NotConfigured
            | SearchProxyError::InvalidBody(_)
            | SearchProxyError::UpstreamStatus(_)
            | SearchProxyError::Transport(_) => Self::internal_error(error.to_string()),
        }
    }
}

impl From<ProfileProxyError> for ApiErrorResponse {
    fn from(error: ProfileProxyError) -> Self {
        match error {
            ProfileProxyError::MissingUsername => Self::bad_request(error.to_string()),
            ProfileProxyError::NotFound => Self::not_found(error.to_string()),
            ProfileProxyError::Transport(TransportError::Timeout(_)) => {
                Self::gateway_timeout(PROFILE_TIMEOUT_MESSAGE)
            }
            // Upstream details stay in the logs.
            ProfileProxyError::NotConfigured
            | ProfileProxyError::UpstreamStatus(_)
            | ProfileProxyError::InvalidBody(_)
            | ProfileProxyError::Transport(_) => Self::internal_error(PROFILE_FAILURE_MESSAGE),
        }
    }
}

impl From<PathRejection> for ApiErrorResponse {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), ApiError::new(rejection.body_text()))
    }
}

impl From<BytesRejection> for ApiErrorResponse {
    fn from(rejection: BytesRejection) -> Self {
        Self::new(rejection.status(), ApiError::new(rejection.body_text()))
    }
}

// =============================================================================
// Panic Conversion
// =============================================================================

/// Converts a handler panic into a 500 JSON error body.
///
/// Installed through `tower_http::catch_panic::CatchPanicLayer`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("Unexpected error");

    tracing::error!(panic = %message, "Handler panicked");
    ApiErrorResponse::internal_error(message).into_response()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    #[rstest]
    fn test_api_error_new() {
        let error = ApiError::new("Test message");
        assert_eq!(error.error, "Test message");
    }

    #[rstest]
    fn test_api_error_serializes_as_error_field() {
        let value = serde_json::to_value(ApiError::new("User not found")).unwrap();
        assert_eq!(value, serde_json::json!({"error": "User not found"}));
    }

    #[rstest]
    #[case(SearchProxyError::MissingQuery, StatusCode::BAD_REQUEST, "Search query is required")]
    #[case(
        SearchProxyError::NotConfigured,
        StatusCode::INTERNAL_SERVER_ERROR,
        "API_URL_SEARCH environment variable is not defined"
    )]
    #[case(
        SearchProxyError::UpstreamStatus(503),
        StatusCode::INTERNAL_SERVER_ERROR,
        "Upstream search API responded with status: 503"
    )]
    #[case(
        SearchProxyError::Transport(TransportError::ConnectionFailed("refused".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR,
        "Connection failed: refused"
    )]
    fn test_search_error_mapping(
        #[case] error: SearchProxyError,
        #[case] status: StatusCode,
        #[case] message: &str,
    ) {
        let response = ApiErrorResponse::from(error);
        assert_eq!(response.status, status);
        assert_eq!(response.error.error, message);
    }

    #[rstest]
    #[case(ProfileProxyError::MissingUsername, StatusCode::BAD_REQUEST, "Username is required")]
    #[case(ProfileProxyError::NotFound, StatusCode::NOT_FOUND, "User not found")]
    #[case(
        ProfileProxyError::UpstreamStatus(500),
        StatusCode::INTERNAL_SERVER_ERROR,
        PROFILE_FAILURE_MESSAGE
    )]
    #[case(
        ProfileProxyError::NotConfigured,
        StatusCode::INTERNAL_SERVER_ERROR,
        PROFILE_FAILURE_MESSAGE
    )]
    #[case(
        ProfileProxyError::Transport(TransportError::Timeout(10_000)),
        StatusCode::GATEWAY_TIMEOUT,
        PROFILE_TIMEOUT_MESSAGE
    )]
    #[case(
        ProfileProxyError::Transport(TransportError::ConnectionFailed("refused".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR,
        PROFILE_FAILURE_MESSAGE
    )]
    fn test_profile_error_mapping(
        #[case] error: ProfileProxyError,
        #[case] status: StatusCode,
        #[case] message: &str,
    ) {
        let response = ApiErrorResponse::from(error);
        assert_eq!(response.status, status);
        assert_eq!(response.error.error, message);
    }

    #[rstest]
    #[tokio::test]
    async fn test_into_response_writes_json_body() {
        let response = ApiErrorResponse::not_found("User not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), br#"{"error":"User not found"}"#);
    }

    #[rstest]
    #[case(Box::new("static message") as Box<dyn Any + Send>, "static message")]
    #[case(Box::new("owned message".to_string()) as Box<dyn Any + Send>, "owned message")]
    #[case(Box::new(42_u8) as Box<dyn Any + Send>, "Unexpected error")]
    #[tokio::test]
    async fn test_panic_response(#[case] panic: Box<dyn Any + Send>, #[case] expected: &str) {
        let response = panic_response(panic);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error, expected);
    }
}
