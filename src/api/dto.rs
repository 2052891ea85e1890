//! Data Transfer Objects for API requests and responses.

use serde::{Deserialize, Serialize};

use super::search::SearchProxyError;
use crate::domain::SearchQuery;

/// Request body of `POST /api/search`.
///
/// ```json
/// { "query": "juan", "limit": 10, "excludeContacts": true }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Free-text query. Required and non-empty.
    #[serde(default)]
    pub query: Option<String>,
    /// Maximum number of results (defaults to 10).
    #[serde(default)]
    pub limit: Option<u32>,
    /// Whether to leave out the caller's contacts (defaults to true).
    #[serde(default)]
    pub exclude_contacts: Option<bool>,
}

impl SearchRequest {
    /// Creates a request carrying only a query.
    #[must_use]
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// Validates the request and applies defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SearchProxyError::MissingQuery`] if the query is absent or empty.
    pub fn into_query(self) -> Result<SearchQuery, SearchProxyError> {
        let text = self
            .query
            .filter(|query| !query.is_empty())
            .ok_or(SearchProxyError::MissingQuery)?;

        let mut query = SearchQuery::new(text);
        if let Some(limit) = self.limit {
            query = query.with_limit(limit);
        }
        if let Some(exclude_contacts) = self.exclude_contacts {
            query = query.with_exclude_contacts(exclude_contacts);
        }
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_SEARCH_LIMIT;
    use rstest::rstest;

    #[rstest]
    fn test_into_query_applies_defaults() {
        let query = SearchRequest::with_query("juan").into_query().unwrap();
        assert_eq!(query.text, "juan");
        assert_eq!(query.limit, DEFAULT_SEARCH_LIMIT);
        assert!(query.exclude_contacts);
    }

    #[rstest]
    fn test_into_query_keeps_explicit_values() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"query":"ana","limit":3,"excludeContacts":false}"#).unwrap();
        let query = request.into_query().unwrap();
        assert_eq!(query.limit, 3);
        assert!(!query.exclude_contacts);
    }

    #[rstest]
    #[case(r"{}")]
    #[case(r#"{"query":null}"#)]
    #[case(r#"{"query":""}"#)]
    fn test_into_query_rejects_missing_query(#[case] body: &str) {
        let request: SearchRequest = serde_json::from_str(body).unwrap();
        assert!(matches!(
            request.into_query(),
            Err(SearchProxyError::MissingQuery)
        ));
    }
}
