//! Profile Search
//!
//! Search orchestration for a third-party professional-profile directory:
//!
//! - [`api`]: axum endpoints proxying the upstream search and profile services
//! - [`domain`]: search queries, canonical result records and the response normalizer
//! - [`infrastructure`]: configuration and the injected upstream HTTP client
//! - [`client`]: debounce, search coordination, profile fetching and navigation

pub mod api;
pub mod client;
pub mod domain;
pub mod infrastructure;
