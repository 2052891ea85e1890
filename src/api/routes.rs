//! Router assembly.
//!
//! Each proxy route group carries its own CORS headers. The headers are set
//! outside the panic guard so that success, error and panic responses all
//! carry them.

use axum::{
    Router,
    http::{HeaderName, HeaderValue, header},
    routing::get,
    routing::post,
};
use tower_http::{
    catch_panic::CatchPanicLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use super::error::panic_response;
use super::handlers::{AppState, health_check, preflight};
use super::profile::{get_profile, get_profile_without_username};
use super::search::search;

/// Path of the search proxy.
pub const SEARCH_PATH: &str = "/api/search";

/// Path prefix of the profile proxy.
pub const PROFILE_PATH_PREFIX: &str = "/api/profiles/";

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let search_routes = Router::new()
        .route(SEARCH_PATH, post(search).options(preflight))
        .layer(CatchPanicLayer::custom(panic_response));

    let profile_routes = Router::new()
        .route(
            "/api/profiles/{username}",
            get(get_profile).options(preflight),
        )
        .route(
            PROFILE_PATH_PREFIX,
            get(get_profile_without_username).options(preflight),
        )
        .layer(CatchPanicLayer::custom(panic_response));

    Router::new()
        .route("/health", get(health_check))
        .merge(with_cors(search_routes, "POST, OPTIONS"))
        .merge(with_cors(profile_routes, "GET, OPTIONS"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn with_cors(routes: Router<AppState>, methods: &'static str) -> Router<AppState> {
    routes
        .layer(cors_header(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(cors_header(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(methods),
        ))
        .layer(cors_header(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
}

fn cors_header(name: HeaderName, value: HeaderValue) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{StubUpstreamClient, UpstreamConfig};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use rstest::rstest;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let stub = StubUpstreamClient::with_response(StatusCode::OK, "[]");
        router(AppState::new(Arc::new(stub), UpstreamConfig::default()))
    }

    #[rstest]
    #[case(SEARCH_PATH, "POST, OPTIONS")]
    #[case("/api/profiles/juamez", "GET, OPTIONS")]
    #[tokio::test]
    async fn test_preflight_carries_cors_headers(#[case] path: &str, #[case] methods: &str) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri(path)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], methods);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
    }

    #[rstest]
    #[tokio::test]
    async fn test_health_has_no_cors_headers() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[rstest]
    #[tokio::test]
    async fn test_empty_username_is_bad_request() {
        let response = app()
            .oneshot(Request::get(PROFILE_PATH_PREFIX).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
