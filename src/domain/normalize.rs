//! Upstream response normalization.
//!
//! The upstream search service has answered, over time, with three shapes:
//!
//! - a JSON array of records
//! - a JSON object whose `results` field holds the array
//! - newline-delimited JSON, one record per line
//!
//! [`decode_body`] turns the raw body into a single JSON value (strict JSON
//! first, NDJSON as fallback) and [`canonicalize`] turns that value into the
//! canonical record list. Neither step fails: anything that cannot be
//! understood degrades to fewer records, down to an empty list.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::record::SearchResultRecord;

/// Number of characters of an undecodable line kept in log output.
const LOGGED_LINE_LIMIT: usize = 200;

// =============================================================================
// Body Decoding
// =============================================================================

/// Result of decoding a raw upstream body.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedBody {
    /// The whole body parsed as one JSON document.
    Json(Value),
    /// The body was read as newline-delimited JSON.
    Ndjson {
        /// Lines that parsed, in order.
        values: Vec<Value>,
        /// Number of non-empty lines that failed to parse.
        skipped: usize,
    },
}

impl DecodedBody {
    /// Collapses the decoded body into the JSON value returned to callers.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Ndjson { values, .. } => Value::Array(values),
        }
    }
}

/// Decodes a raw upstream body.
///
/// A body that is one valid JSON document is returned unchanged. Otherwise
/// every trimmed, non-empty line is parsed on its own; lines that fail are
/// logged and skipped.
#[must_use]
pub fn decode_body(text: &str) -> DecodedBody {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return DecodedBody::Json(value);
    }

    let mut values = Vec::new();
    let mut skipped = 0;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => values.push(value),
            Err(error) => {
                skipped += 1;
                tracing::warn!(
                    %error,
                    line = %truncate(line, LOGGED_LINE_LIMIT),
                    "Skipping undecodable NDJSON line"
                );
            }
        }
    }

    DecodedBody::Ndjson { values, skipped }
}

/// Shortens `text` to at most `limit` characters for logging.
pub(crate) fn truncate(text: &str, limit: usize) -> &str {
    text.char_indices()
        .nth(limit)
        .map_or(text, |(index, _)| &text[..index])
}

// =============================================================================
// Shape Reconciliation
// =============================================================================

/// Known response shapes, tried in declaration order.
#[derive(Deserialize)]
#[serde(untagged)]
enum ResponseShape {
    List(Vec<Value>),
    Wrapped { results: Vec<Value> },
    Keyed(Map<String, Value>),
}

impl ResponseShape {
    fn into_candidates(self) -> Vec<Value> {
        match self {
            Self::List(values) | Self::Wrapped { results: values } => values,
            Self::Keyed(map) => map
                .into_iter()
                .map(|(_, value)| value)
                .filter(|value| value.as_object().is_some_and(|object| object.contains_key("name")))
                .collect(),
        }
    }
}

/// Turns a decoded response value into the canonical record list.
///
/// Shapes are tried in order: bare list, object with a `results` list, then
/// any other object whose values are records carrying a `name`. Every other
/// value yields an empty list. Entries that are not objects are dropped, and
/// records sharing a [`key`](SearchResultRecord::key) keep only their first
/// occurrence. Records without any identity are never deduplicated.
#[must_use]
pub fn canonicalize(value: Value) -> Vec<SearchResultRecord> {
    let Ok(shape) = ResponseShape::deserialize(value) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    shape
        .into_candidates()
        .iter()
        .filter_map(SearchResultRecord::from_value)
        .filter(|record| !record.has_identity() || seen.insert(record.key()))
        .collect()
}

/// Decodes and canonicalizes a raw upstream body in one step.
#[must_use]
pub fn normalize(text: &str) -> Vec<SearchResultRecord> {
    canonicalize(decode_body(text).into_value())
}
