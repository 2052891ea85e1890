//! Common test helpers for integration tests.
//!
//! Provides router construction over a stub upstream, request/response
//! helpers for `tower::ServiceExt::oneshot`, and loopback servers for the
//! end-to-end tests.
//!
//! # Note
//!
//! Each integration test file is compiled as a separate crate, so helpers
//! used by only one of them would otherwise raise dead code warnings.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::Path,
    http::{Method, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::net::TcpListener;

use profile_search::api::{AppState, router};
use profile_search::infrastructure::{StubUpstreamClient, UpstreamClient, UpstreamConfig};

pub const SEARCH_URL: &str = "https://upstream.test/search";
pub const PROFILE_BASE_URL: &str = "https://upstream.test/genome/bios/";

/// The single record returned by the reference search fixture.
pub const JUAN_RESULTS: &str = r#"[{"id":"1","name":"Juan Perez","username":"juamez"}]"#;

// =============================================================================
// Router Helpers
// =============================================================================

/// Upstream configuration with both URLs set.
pub fn configured() -> UpstreamConfig {
    UpstreamConfig::default()
        .with_search_url(SEARCH_URL)
        .with_profile_base_url(PROFILE_BASE_URL)
}

/// Builds the application router over `stub` and returns both.
pub fn stub_app(stub: StubUpstreamClient, config: UpstreamConfig) -> (Router, Arc<StubUpstreamClient>) {
    let stub = Arc::new(stub);
    let state = AppState::new(Arc::clone(&stub) as Arc<dyn UpstreamClient>, config);
    (router(state), stub)
}

/// Builds a JSON POST request.
pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Builds a bodiless request.
pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Reads the full response body.
pub async fn read_body(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Reads the response body as JSON.
pub async fn read_json(response: Response) -> Value {
    serde_json::from_slice(&read_body(response).await).unwrap()
}

/// Asserts the three CORS headers with the given allowed methods.
pub fn assert_cors(response: &Response, methods: &str) {
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], methods);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
}

// =============================================================================
// Loopback Servers
// =============================================================================

/// Serves `app` on an ephemeral loopback port.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    address
}

/// Fake upstream directory.
///
/// - `POST /search` answers `search_body` with 200
/// - `GET /genome/bios/{username}` answers a small profile, 404 for `ghost`,
///   and sleeps for `profile_delay` first
pub async fn spawn_upstream(search_body: &'static str, profile_delay: Duration) -> SocketAddr {
    let app = Router::new()
        .route(
            "/search",
            post(move || async move {
                ([(header::CONTENT_TYPE, "application/json")], search_body).into_response()
            }),
        )
        .route(
            "/genome/bios/{username}",
            get(move |Path(username): Path<String>| async move {
                tokio::time::sleep(profile_delay).await;
                if username == "ghost" {
                    return (StatusCode::NOT_FOUND, "no such user").into_response();
                }
                Json(serde_json::json!({
                    "person": { "publicId": username, "name": "Juan Perez" }
                }))
                .into_response()
            }),
        );
    spawn_server(app).await
}

/// Polls `check` every 20 ms until it returns true or `limit` elapses.
pub async fn wait_until<F: Fn() -> bool>(limit: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
