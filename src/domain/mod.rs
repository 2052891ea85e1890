//! Domain module for profile search.
//!
//! This module contains the search query value object, the canonical
//! result record and the upstream response normalizer.

pub mod normalize;
pub mod query;
pub mod record;

pub use normalize::{DecodedBody, canonicalize, decode_body, normalize};
pub use query::{DEFAULT_SEARCH_LIMIT, SearchQuery};
pub use record::{RecordKey, SearchResultRecord};
