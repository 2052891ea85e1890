//! Canonical search result record.
//!
//! Upstream records come in slightly different spellings depending on the
//! endpoint generation that produced them, so decoding is done field by field
//! from a JSON object instead of through a derived `Deserialize`. Derived
//! aliases would reject objects carrying both spellings of the same field.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Search Result Record
// =============================================================================

/// One entry of the canonical result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultRecord {
    /// Upstream identifier (`id`, or `ardaId` on older payloads).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Username used to address the profile endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Entity kind reported by upstream (`person`, `organization`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Avatar URL (`imageUrl`, or `pictureThumbnail` on older payloads).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Whether upstream marks the profile as verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    /// Upstream relevance score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_rank: Option<f64>,
}

impl SearchResultRecord {
    /// Creates a record with only an id and a name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            username: None,
            kind: String::new(),
            image_url: None,
            verified: None,
            page_rank: None,
        }
    }

    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Decodes a record from an upstream JSON value.
    ///
    /// Returns `None` when the value is not an object. Fields with an
    /// unexpected type are treated as absent.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        Some(Self {
            id: identifier(object, "id").or_else(|| identifier(object, "ardaId")),
            name: text(object, "name").unwrap_or_default(),
            username: text(object, "username"),
            kind: text(object, "type").unwrap_or_default(),
            image_url: text(object, "imageUrl").or_else(|| text(object, "pictureThumbnail")),
            verified: object.get("verified").and_then(Value::as_bool),
            page_rank: object.get("pageRank").and_then(number),
        })
    }

    /// Returns the identity used to compare records across requests.
    ///
    /// Records without an upstream id fall back to their name and username.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        self.id.as_ref().map_or_else(
            || RecordKey::Composite {
                name: self.name.clone(),
                username: self.username.clone().unwrap_or_default(),
            },
            |id| RecordKey::Id(id.clone()),
        )
    }

    /// Returns whether [`key`](Self::key) tells this record apart from others.
    ///
    /// False for records with no id, no name and no username, whose composite
    /// key would be empty.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        self.id.is_some()
            || !self.name.is_empty()
            || self.username.as_deref().is_some_and(|username| !username.is_empty())
    }
}

fn text(object: &Map<String, Value>, field: &str) -> Option<String> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn identifier(object: &Map<String, Value>, field: &str) -> Option<String> {
    match object.get(field)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

// =============================================================================
// Record Key
// =============================================================================

/// Stable identity of a search result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// Upstream-provided identifier.
    Id(String),
    /// Fallback for records that arrive without an identifier.
    Composite {
        /// Display name.
        name: String,
        /// Username, empty when absent.
        username: String,
    },
}

impl fmt::Display for RecordKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(formatter, "{id}"),
            Self::Composite { name, username } => write!(formatter, "{name}\u{1f}{username}"),
        }
    }
}
