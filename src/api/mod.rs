//! API module for HTTP handlers.
//!
//! This module contains route definitions and request/response handlers
//! for the search and profile proxies.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod profile;
pub mod routes;
pub mod search;

pub use dto::SearchRequest;
pub use error::{
    ApiError, ApiErrorResponse, PROFILE_FAILURE_MESSAGE, PROFILE_TIMEOUT_MESSAGE, panic_response,
};
pub use handlers::{AppState, HealthResponse, health_check, preflight};
pub use profile::{ProfileProxyError, fetch_profile, get_profile, profile_url};
pub use routes::{PROFILE_PATH_PREFIX, SEARCH_PATH, router};
pub use search::{SearchProxyError, forward_search, search};
