//! Profile fetching for a profile page.
//!
//! [`ProfileFetch`] exposes a `{data, error}` pair through a
//! [`tokio::sync::watch`] channel. Requests are identified by URL, method
//! and body; asking again for the request currently held does not hit the
//! network.

use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use crate::infrastructure::{UpstreamClient, UpstreamRequest};

/// Error reported when the server answers with a non-2xx status.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch";

/// Identity of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// JSON body, sent only with `POST`.
    pub body: Option<Value>,
}

impl FetchRequest {
    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            body: None,
        }
    }

    /// Creates a POST request with a JSON body.
    #[must_use]
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            method: Method::POST,
            body: Some(body),
        }
    }

    fn to_upstream(&self) -> UpstreamRequest {
        let mut request = UpstreamRequest::get(self.url.as_str()).with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        request.method = self.method.clone();
        if self.method == Method::POST {
            request.body = self
                .body
                .as_ref()
                .map(|body| body.to_string().into_bytes().into());
        }
        request
    }
}

/// Observable state of a [`ProfileFetch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchState {
    /// Decoded response, once received.
    pub data: Option<Value>,
    /// Error message, if the last fetch failed.
    pub error: Option<String>,
}

impl FetchState {
    /// Returns whether neither data nor an error has arrived yet.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }
}

struct Current {
    generation: u64,
    request: Option<FetchRequest>,
}

/// Keyed fetch of a single JSON document.
pub struct ProfileFetch {
    client: Arc<dyn UpstreamClient>,
    current: Mutex<Current>,
    state: watch::Sender<FetchState>,
}

impl ProfileFetch {
    /// Creates an idle fetcher.
    #[must_use]
    pub fn new(client: Arc<dyn UpstreamClient>) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            client,
            current: Mutex::new(Current {
                generation: 0,
                request: None,
            }),
            state,
        }
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state.subscribe()
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    /// Fetches `request` unless it is the request already held.
    ///
    /// A new identity resets the state before the request is sent. If
    /// another identity is requested while this one is in flight, its
    /// result is dropped.
    pub async fn request(&self, request: FetchRequest) -> FetchState {
        let generation = {
            let mut current = self.current.lock();
            if current.request.as_ref() == Some(&request) {
                return self.state();
            }
            current.generation += 1;
            current.request = Some(request.clone());
            self.state.send_replace(FetchState::default());
            current.generation
        };

        tracing::debug!(url = %request.url, method = %request.method, "Fetching");
        let outcome = self.fetch(&request).await;

        let current = self.current.lock();
        if current.generation != generation {
            tracing::debug!(url = %request.url, "Discarding superseded fetch result");
        } else {
            self.state.send_replace(match outcome {
                Ok(data) => FetchState {
                    data: Some(data),
                    error: None,
                },
                Err(error) => {
                    tracing::error!(url = %request.url, %error, "Fetch error");
                    FetchState {
                        data: None,
                        error: Some(error),
                    }
                }
            });
        }
        drop(current);

        self.state()
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Value, String> {
        let response = self
            .client
            .send(request.to_upstream())
            .await
            .map_err(|error| error.to_string())?;

        if !response.status.is_success() {
            return Err(FETCH_FAILED_MESSAGE.to_string());
        }

        let text = response.body.map_err(|error| error.to_string())?;
        serde_json::from_str(&text).map_err(|error| error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{
        ScriptedReply, StubUpstreamClient, TransportError, UpstreamResponse,
    };
    use axum::http::StatusCode;
    use rstest::rstest;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::sleep;

    fn fetcher(stub: &Arc<StubUpstreamClient>) -> ProfileFetch {
        ProfileFetch::new(Arc::clone(stub) as Arc<dyn UpstreamClient>)
    }

    #[rstest]
    #[tokio::test]
    async fn test_success_sets_data() {
        let stub = Arc::new(StubUpstreamClient::with_response(
            StatusCode::OK,
            r#"{"person":{"name":"Juan"}}"#,
        ));
        let fetch = fetcher(&stub);
        assert!(fetch.state().is_loading());

        let state = fetch.request(FetchRequest::get("/api/profiles/juamez")).await;

        assert_eq!(state.data, Some(json!({"person": {"name": "Juan"}})));
        assert_eq!(state.error, None);
        assert_eq!(fetch.state(), state);
    }

    #[rstest]
    #[tokio::test]
    async fn test_same_identity_does_not_refetch() {
        let stub = Arc::new(StubUpstreamClient::with_response(StatusCode::OK, "{}"));
        let fetch = fetcher(&stub);

        fetch.request(FetchRequest::get("/api/profiles/a")).await;
        fetch.request(FetchRequest::get("/api/profiles/a")).await;
        assert_eq!(stub.request_count(), 1);

        fetch.request(FetchRequest::get("/api/profiles/b")).await;
        fetch
            .request(FetchRequest::post("/api/profiles/b", json!({"x": 1})))
            .await;
        assert_eq!(stub.request_count(), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn test_post_sends_json_body() {
        let stub = Arc::new(StubUpstreamClient::with_response(StatusCode::OK, "{}"));
        let fetch = fetcher(&stub);

        fetch
            .request(FetchRequest::post("/api/search", json!({"query": "a"})))
            .await;

        let request = &stub.requests()[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body_text(), Some(r#"{"query":"a"}"#));
        assert_eq!(
            request.headers.get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[rstest]
    #[case(
        StubUpstreamClient::with_response(StatusCode::NOT_FOUND, r#"{"error":"User not found"}"#),
        FETCH_FAILED_MESSAGE
    )]
    #[case(
        StubUpstreamClient::with_error(TransportError::ConnectionFailed("refused".to_string())),
        "Connection failed: refused"
    )]
    #[tokio::test]
    async fn test_failure_sets_error(#[case] stub: StubUpstreamClient, #[case] expected: &str) {
        let stub = Arc::new(stub);
        let state = fetcher(&stub)
            .request(FetchRequest::get("/api/profiles/ghost"))
            .await;

        assert_eq!(state.data, None);
        assert_eq!(state.error.as_deref(), Some(expected));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_superseded_result_is_dropped() {
        let stub = Arc::new(StubUpstreamClient::scripted(vec![
            ScriptedReply::delayed(
                Duration::from_millis(300),
                Ok(UpstreamResponse::new(StatusCode::OK, r#"{"who":"old"}"#)),
            ),
            ScriptedReply::immediate(Ok(UpstreamResponse::new(
                StatusCode::OK,
                r#"{"who":"new"}"#,
            ))),
        ]));
        let fetch = fetcher(&stub);

        tokio::join!(fetch.request(FetchRequest::get("/old")), async {
            sleep(Duration::from_millis(1)).await;
            fetch.request(FetchRequest::get("/new")).await
        });

        assert_eq!(fetch.state().data, Some(json!({"who": "new"})));
    }

    #[rstest]
    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let stub = Arc::new(StubUpstreamClient::with_response(StatusCode::OK, r#"{"ok":true}"#));
        let fetch = fetcher(&stub);
        let mut receiver = fetch.subscribe();

        fetch.request(FetchRequest::get("/api/profiles/a")).await;

        assert!(receiver.has_changed().unwrap());
        assert_eq!(receiver.borrow_and_update().data, Some(json!({"ok": true})));
    }
}
