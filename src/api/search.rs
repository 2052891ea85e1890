//! `POST /api/search`: forwards a search to the upstream service.
//!
//! The upstream body is returned as-is when it is one JSON document and
//! assembled into a JSON array when it is newline-delimited JSON. Shape
//! reconciliation into canonical records happens on the consuming side
//! (see [`crate::domain::canonicalize`]).
//!
//! # Response
//!
//! - **200 OK**: upstream JSON, or the array built from its NDJSON lines
//! - **400 Bad Request**: `{"error": "Search query is required"}`
//! - **413 Payload Too Large**: request body over the body limit
//! - **500 Internal Server Error**: search URL not configured, invalid
//!   request body, upstream non-2xx or transport failure

use axum::{
    Json,
    extract::{State, rejection::BytesRejection},
    http::{HeaderValue, header},
};
use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

use super::dto::SearchRequest;
use super::error::ApiErrorResponse;
use super::handlers::AppState;
use crate::domain::normalize::truncate;
use crate::domain::{DecodedBody, SearchQuery, decode_body};
use crate::infrastructure::{TransportError, UpstreamClient, UpstreamConfig, UpstreamRequest};

/// Number of characters of an upstream error body kept in log output.
const LOGGED_BODY_LIMIT: usize = 500;

// =============================================================================
// Search Proxy Error
// =============================================================================

/// Failures of the search proxy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchProxyError {
    /// The request carried no query.
    #[error("Search query is required")]
    MissingQuery,

    /// `API_URL_SEARCH` is not configured.
    #[error("API_URL_SEARCH environment variable is not defined")]
    NotConfigured,

    /// The request body is not a valid search request.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Upstream answered with a non-2xx status.
    #[error("Upstream search API responded with status: {0}")]
    UpstreamStatus(u16),

    /// Upstream could not be reached or its body could not be read.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// =============================================================================
// POST /api/search Handler
// =============================================================================

/// Search proxy endpoint.
///
/// The body is parsed by hand so that a missing or non-JSON content type is
/// not rejected before validation runs.
///
/// # Errors
///
/// Returns [`ApiErrorResponse`] as described in the module documentation.
pub async fn search(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, ApiErrorResponse> {
    let body =
        body.inspect_err(|rejection| tracing::warn!(%rejection, "Rejecting search request"))?;
    tracing::info!(bytes = body.len(), "Search request received");

    let request: SearchRequest = serde_json::from_slice(&body)
        .map_err(|error| SearchProxyError::InvalidBody(error.to_string()))
        .inspect_err(|error| tracing::warn!(%error, "Rejecting search request"))?;

    let query = request
        .into_query()
        .inspect_err(|error| tracing::info!(%error, "Rejecting search request"))?;

    let value = forward_search(state.upstream.as_ref(), &state.config, &query)
        .await
        .inspect_err(|error| tracing::error!(%error, query = %query.text, "Search proxy failed"))?;

    Ok(Json(value))
}

/// Forwards `query` to the configured search URL and decodes the answer.
///
/// # Errors
///
/// Returns [`SearchProxyError::NotConfigured`] when no search URL is set,
/// [`SearchProxyError::UpstreamStatus`] on a non-2xx answer and
/// [`SearchProxyError::Transport`] when upstream cannot be reached or read.
pub async fn forward_search(
    upstream: &dyn UpstreamClient,
    config: &UpstreamConfig,
    query: &SearchQuery,
) -> Result<Value, SearchProxyError> {
    let url = config
        .search_url
        .as_deref()
        .ok_or(SearchProxyError::NotConfigured)?;

    tracing::info!(
        query = %query.text,
        limit = query.limit,
        exclude_contacts = query.exclude_contacts,
        client = upstream.client_name(),
        "Forwarding search upstream"
    );

    let request = UpstreamRequest::post_json(url, query)?.with_header(
        header::USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("profile-search")),
    );
    let response = upstream.send(request).await?;

    tracing::info!(status = response.status.as_u16(), "Upstream search responded");

    if !response.status.is_success() {
        match &response.body {
            Ok(text) => tracing::error!(
                status = response.status.as_u16(),
                body = %truncate(text, LOGGED_BODY_LIMIT),
                "Upstream search error response"
            ),
            Err(error) => tracing::error!(
                status = response.status.as_u16(),
                %error,
                "Upstream search error response (body unreadable)"
            ),
        }
        return Err(SearchProxyError::UpstreamStatus(response.status.as_u16()));
    }

    let text = response.body?;
    let decoded = decode_body(&text);
    match &decoded {
        DecodedBody::Json(_) => tracing::debug!("Upstream search body parsed as JSON"),
        DecodedBody::Ndjson { values, skipped } => tracing::info!(
            records = values.len(),
            skipped,
            "Upstream search body parsed as NDJSON"
        ),
    }

    Ok(decoded.into_value())
}

// =============================================================================
// Tests
// =============================================================================
