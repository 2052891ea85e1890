//! Upstream HTTP client capability.
//!
//! Endpoints never reach for a process-wide client. They receive an
//! [`UpstreamClient`] through application state, which lets tests swap in
//! [`StubUpstreamClient`] without any network.
//!
//! # Design Principles
//!
//! - **The response body is read by the client** - callers get the status and
//!   the body text (or the error that prevented reading it) in one value
//! - **Transport failures are classified** - timeouts are distinguishable from
//!   connection failures so endpoints can map them to 504

use std::collections::VecDeque;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Transport Error
// =============================================================================

/// Error type for upstream transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request timed out after the configured duration.
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// Failed to establish a connection to the upstream service.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The request could not be built (invalid URL, unencodable body).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The response body could not be read.
    #[error("Failed to read response body: {0}")]
    BodyRead(String),

    /// Any other transport failure.
    #[error("Request failed: {0}")]
    Other(String),
}

impl TransportError {
    /// Returns whether this error is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

// =============================================================================
// Request / Response
// =============================================================================

/// A request to forward upstream.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
}

impl UpstreamRequest {
    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Creates a POST request with a JSON body and `Content-Type: application/json`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] if the payload cannot be serialized.
    pub fn post_json<T: Serialize>(url: impl Into<String>, payload: &T) -> Result<Self, TransportError> {
        let body = serde_json::to_vec(payload)
            .map_err(|error| TransportError::InvalidRequest(error.to_string()))?;

        Ok(Self {
            method: Method::POST,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Some(Bytes::from(body)),
        }
        .with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ))
    }

    /// Adds a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the body as UTF-8 text, if any.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        self.body
            .as_deref()
            .and_then(|body| std::str::from_utf8(body).ok())
    }
}

/// A response received from upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    /// Response status.
    pub status: StatusCode,
    /// Body text, or the error that prevented reading it.
    pub body: Result<String, TransportError>,
}

impl UpstreamResponse {
    /// Creates a response with a readable body.
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Ok(body.into()),
        }
    }

    /// Creates a response whose body could not be read.
    #[must_use]
    pub const fn unreadable(status: StatusCode, error: TransportError) -> Self {
        Self {
            status,
            body: Err(error),
        }
    }
}

// =============================================================================
// Upstream Client Trait
// =============================================================================

/// Capability to send HTTP requests to upstream services.
pub trait UpstreamClient: Send + Sync {
    /// Sends the request and reads the full response body.
    ///
    /// Returns `Err` only when no response was received at all. Non-2xx
    /// statuses are returned as `Ok` responses.
    fn send(&self, request: UpstreamRequest)
    -> BoxFuture<'static, Result<UpstreamResponse, TransportError>>;

    /// Returns the client name for logging.
    fn client_name(&self) -> &'static str;
}

// =============================================================================
// Reqwest Upstream Client
// =============================================================================

/// [`UpstreamClient`] backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestUpstreamClient {
    /// HTTP client.
    client: reqwest::Client,
    /// Request timeout duration.
    timeout: Duration,
}

impl ReqwestUpstreamClient {
    /// Creates a client applying `timeout` to every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be constructed
    /// (for example when no TLS backend is available).
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|error| TransportError::Other(error.to_string()))?;

        Ok(Self { client, timeout })
    }
}

impl UpstreamClient for ReqwestUpstreamClient {
    fn send(
        &self,
        request: UpstreamRequest,
    ) -> BoxFuture<'static, Result<UpstreamResponse, TransportError>> {
        let client = self.client.clone();
        let timeout = self.timeout;

        async move { execute_http_io(&client, request, timeout).await }.boxed()
    }

    fn client_name(&self) -> &'static str {
        "reqwest"
    }
}

/// Executes one HTTP exchange.
#[allow(clippy::cast_possible_truncation)] // Timeout in ms will not exceed u64
async fn execute_http_io(
    client: &reqwest::Client,
    request: UpstreamRequest,
    timeout: Duration,
) -> Result<UpstreamResponse, TransportError> {
    let timeout_ms = timeout.as_millis() as u64;

    let mut builder = client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .timeout(timeout);
    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    let response = builder
        .send()
        .await
        .map_err(|error| classify(&error, timeout_ms))?;

    let status = response.status();
    let body = response.text().await.map_err(|error| {
        if error.is_timeout() {
            TransportError::Timeout(timeout_ms)
        } else {
            TransportError::BodyRead(error.to_string())
        }
    });

    Ok(UpstreamResponse { status, body })
}

fn classify(error: &reqwest::Error, timeout_ms: u64) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout_ms)
    } else if error.is_connect() {
        TransportError::ConnectionFailed(error.to_string())
    } else if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

// =============================================================================
// Stub Upstream Client (for testing)
// =============================================================================

/// One scripted answer of a [`StubUpstreamClient`].
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    /// Time to wait before answering.
    pub delay: Duration,
    /// The answer.
    pub result: Result<UpstreamResponse, TransportError>,
}

impl ScriptedReply {
    /// Creates an immediate reply.
    #[must_use]
    pub const fn immediate(result: Result<UpstreamResponse, TransportError>) -> Self {
        Self {
            delay: Duration::ZERO,
            result,
        }
    }

    /// Creates a reply delivered after `delay`.
    #[must_use]
    pub const fn delayed(delay: Duration, result: Result<UpstreamResponse, TransportError>) -> Self {
        Self { delay, result }
    }
}

/// Stub upstream client for testing.
///
/// Answers with scripted replies in order; the last reply is repeated once
/// the script runs out. Every request is recorded.
pub struct StubUpstreamClient {
    /// Remaining replies.
    replies: Mutex<VecDeque<ScriptedReply>>,
    /// Requests received so far.
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl StubUpstreamClient {
    /// Creates a stub answering with the given replies in order.
    ///
    /// An empty script fails every request with [`TransportError::Other`].
    #[must_use]
    pub fn scripted(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates a stub that always answers `status` with `body`.
    #[must_use]
    pub fn with_response(status: StatusCode, body: impl Into<String>) -> Self {
        Self::scripted(vec![ScriptedReply::immediate(Ok(UpstreamResponse::new(
            status, body,
        )))])
    }

    /// Creates a stub that always fails with `error`.
    #[must_use]
    pub fn with_error(error: TransportError) -> Self {
        Self::scripted(vec![ScriptedReply::immediate(Err(error))])
    }

    /// Returns a copy of every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_reply(&self) -> ScriptedReply {
        let mut replies = self.replies.lock();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        reply.unwrap_or_else(|| {
            ScriptedReply::immediate(Err(TransportError::Other("no reply scripted".to_string())))
        })
    }
}

impl UpstreamClient for StubUpstreamClient {
    fn send(
        &self,
        request: UpstreamRequest,
    ) -> BoxFuture<'static, Result<UpstreamResponse, TransportError>> {
        self.requests.lock().push(request);
        let reply = self.next_reply();

        async move {
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            reply.result
        }
        .boxed()
    }

    fn client_name(&self) -> &'static str {
        "stub"
    }
}

// =============================================================================
// Tests
// =============================================================================
