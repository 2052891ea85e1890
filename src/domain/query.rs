//! Search query value object.

use serde::{Deserialize, Serialize};

/// Number of results requested from upstream when the caller does not say.
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// A single search request as dispatched to the upstream service.
///
/// Serializes to the upstream payload shape:
///
/// ```json
/// { "query": "juan", "limit": 10, "excludeContacts": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Raw user input. Empty text means "no search".
    #[serde(rename = "query")]
    pub text: String,
    /// Maximum number of results.
    pub limit: u32,
    /// Whether the upstream should leave out the caller's own contacts.
    #[serde(rename = "excludeContacts")]
    pub exclude_contacts: bool,
}

impl SearchQuery {
    /// Creates a query with the default limit and contact exclusion.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: DEFAULT_SEARCH_LIMIT,
            exclude_contacts: true,
        }
    }

    /// Overrides the result limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Overrides contact exclusion.
    #[must_use]
    pub const fn with_exclude_contacts(mut self, exclude_contacts: bool) -> Self {
        self.exclude_contacts = exclude_contacts;
        self
    }

    /// Returns true for the distinguished "no search" state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_new_applies_defaults() {
        let query = SearchQuery::new("juan");
        assert_eq!(query.text, "juan");
        assert_eq!(query.limit, DEFAULT_SEARCH_LIMIT);
        assert!(query.exclude_contacts);
    }

    #[rstest]
    fn test_builders_override_defaults() {
        let query = SearchQuery::new("juan")
            .with_limit(25)
            .with_exclude_contacts(false);
        assert_eq!(query.limit, 25);
        assert!(!query.exclude_contacts);
    }

    #[rstest]
    #[case("", true)]
    #[case(" ", false)]
    #[case("a", false)]
    fn test_is_empty(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(SearchQuery::new(text).is_empty(), expected);
    }

    #[rstest]
    fn test_serializes_to_upstream_payload() {
        let value = serde_json::to_value(SearchQuery::new("juan")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"query": "juan", "limit": 10, "excludeContacts": true})
        );
    }
}
