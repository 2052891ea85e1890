//! Search coordination for an interactive search view.
//!
//! [`SearchCoordinator`] turns settled query texts into result lists. Each
//! dispatch is tagged with a generation number and only the response of the
//! newest generation may replace the visible list, so slow responses for
//! superseded queries never overwrite newer results.
//!
//! [`SearchView`] wires a [`DebounceController`] in front of the coordinator.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use axum::http::{HeaderValue, header};
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;

use super::debounce::{DEFAULT_DEBOUNCE_DELAY, DebounceController};
use crate::domain::normalize::truncate;
use crate::domain::{SearchQuery, SearchResultRecord, canonicalize};
use crate::infrastructure::{TransportError, UpstreamClient, UpstreamRequest};

// =============================================================================
// Search Backend
// =============================================================================

/// Errors reported by a [`SearchBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The search endpoint could not be reached.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The search endpoint answered with a non-2xx status.
    #[error("Failed to fetch search results: {0}")]
    Status(u16),

    /// The search endpoint answered 2xx with a body that is not JSON.
    #[error("Search response is not valid JSON: {0}")]
    InvalidBody(String),
}

/// Source of raw search responses.
pub trait SearchBackend: Send + Sync {
    /// Runs one search and returns the decoded JSON body.
    fn search(&self, query: SearchQuery) -> BoxFuture<'static, Result<Value, BackendError>>;
}

/// [`SearchBackend`] calling the search proxy over HTTP.
pub struct HttpSearchBackend {
    client: Arc<dyn UpstreamClient>,
    endpoint: String,
}

impl HttpSearchBackend {
    /// Creates a backend posting to `endpoint` (for example
    /// `http://localhost:3000/api/search`).
    #[must_use]
    pub fn new(client: Arc<dyn UpstreamClient>, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl SearchBackend for HttpSearchBackend {
    fn search(&self, query: SearchQuery) -> BoxFuture<'static, Result<Value, BackendError>> {
        let client = Arc::clone(&self.client);
        let endpoint = self.endpoint.clone();

        async move { post_search(client.as_ref(), endpoint, &query).await }.boxed()
    }
}

async fn post_search(
    client: &dyn UpstreamClient,
    endpoint: String,
    query: &SearchQuery,
) -> Result<Value, BackendError> {
    let request = UpstreamRequest::post_json(endpoint, query)?
        .with_header(header::ACCEPT, HeaderValue::from_static("application/json"));
    let response = client.send(request).await?;

    if !response.status.is_success() {
        if let Ok(text) = &response.body {
            tracing::error!(
                status = response.status.as_u16(),
                body = %truncate(text, 200),
                "Search endpoint error response"
            );
        }
        return Err(BackendError::Status(response.status.as_u16()));
    }

    let text = response.body?;
    serde_json::from_str(&text).map_err(|error| BackendError::InvalidBody(error.to_string()))
}

// =============================================================================
// Search Coordinator
// =============================================================================

/// What happened to one dispatched query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Empty query: the list was cleared without a request.
    Cleared,
    /// The response was accepted; holds the number of records shown.
    Committed(usize),
    /// The request failed and the list was replaced by an empty one.
    Failed,
    /// A newer query was dispatched meanwhile; the response was dropped.
    Discarded,
}

/// Owns the query text and the visible result list of one search view.
pub struct SearchCoordinator {
    backend: Arc<dyn SearchBackend>,
    query_text: Mutex<String>,
    /// Generation of the newest dispatch. Commits happen under this lock.
    latest: Mutex<u64>,
    results: ArcSwapOption<Vec<SearchResultRecord>>,
}

impl SearchCoordinator {
    /// Creates a coordinator with no results yet.
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            query_text: Mutex::new(String::new()),
            latest: Mutex::new(0),
            results: ArcSwapOption::empty(),
        }
    }

    /// Records the text currently typed by the user.
    pub fn set_query_text(&self, text: impl Into<String>) {
        *self.query_text.lock() = text.into();
    }

    /// Returns the text currently typed by the user.
    #[must_use]
    pub fn query_text(&self) -> String {
        self.query_text.lock().clone()
    }

    /// Returns the visible result list.
    ///
    /// `None` until the first dispatch completes. An empty list means the
    /// last search matched nothing (or was cleared).
    #[must_use]
    pub fn current_results(&self) -> Option<Arc<Vec<SearchResultRecord>>> {
        self.results.load_full()
    }

    /// Replaces the visible list with an empty one.
    ///
    /// Responses of searches still in flight are discarded.
    pub fn clear(&self) {
        let mut latest = self.latest.lock();
        *latest += 1;
        self.results.store(Some(Arc::new(Vec::new())));
        tracing::debug!(generation = *latest, "Empty query, results cleared");
    }

    /// Runs a search for `text` and publishes the outcome.
    ///
    /// Empty text clears the list synchronously and never reaches the
    /// backend. Otherwise the response is published only if no newer
    /// dispatch started while it was in flight.
    pub async fn dispatch(&self, text: impl Into<String>) -> DispatchOutcome {
        let text = text.into();

        if text.is_empty() {
            self.clear();
            return DispatchOutcome::Cleared;
        }

        let generation = {
            let mut latest = self.latest.lock();
            *latest += 1;
            *latest
        };
        tracing::debug!(generation, query = %text, "Dispatching search");

        let response = self.backend.search(SearchQuery::new(text.as_str())).await;

        let (records, outcome) = match response {
            Ok(value) => {
                let records = canonicalize(value);
                let count = records.len();
                (records, DispatchOutcome::Committed(count))
            }
            Err(error) => {
                tracing::error!(%error, query = %text, "Search error");
                (Vec::new(), DispatchOutcome::Failed)
            }
        };

        let latest = self.latest.lock();
        if *latest != generation {
            tracing::debug!(
                generation,
                latest = *latest,
                query = %text,
                "Discarding stale search response"
            );
            return DispatchOutcome::Discarded;
        }
        self.results.store(Some(Arc::new(records)));
        drop(latest);

        outcome
    }
}

// =============================================================================
// Search View
// =============================================================================

/// Debounced search view state.
///
/// Keystrokes go through [`set_query_text`](Self::set_query_text); every
/// settled text is dispatched on its own task so that a slow response never
/// delays a newer query. Dropping the view cancels the pending debounce
/// timer.
pub struct SearchView {
    coordinator: Arc<SearchCoordinator>,
    debounce: DebounceController<String>,
    pump: JoinHandle<()>,
}

impl SearchView {
    /// Creates a view with the default 500 ms debounce window.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self::with_delay(backend, DEFAULT_DEBOUNCE_DELAY)
    }

    /// Creates a view with a custom debounce window.
    #[must_use]
    pub fn with_delay(backend: Arc<dyn SearchBackend>, delay: Duration) -> Self {
        let coordinator = Arc::new(SearchCoordinator::new(backend));
        let (debounce, mut settled) = DebounceController::spawn(delay);

        let pump_coordinator = Arc::clone(&coordinator);
        let pump = tokio::spawn(async move {
            while let Some(text) = settled.recv().await {
                let coordinator = Arc::clone(&pump_coordinator);
                tokio::spawn(async move {
                    coordinator.dispatch(text).await;
                });
            }
        });

        Self {
            coordinator,
            debounce,
            pump,
        }
    }

    /// Handles a change of the search input.
    ///
    /// Empty text clears the results at once and cancels the pending search.
    /// Any other text is dispatched once the debounce window settles.
    pub fn set_query_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.coordinator.set_query_text(text.clone());

        if text.is_empty() {
            self.coordinator.clear();
            self.debounce.reset();
        } else {
            self.debounce.input(text);
        }
    }

    /// See [`SearchCoordinator::query_text`].
    #[must_use]
    pub fn query_text(&self) -> String {
        self.coordinator.query_text()
    }

    /// See [`SearchCoordinator::current_results`].
    #[must_use]
    pub fn current_results(&self) -> Option<Arc<Vec<SearchResultRecord>>> {
        self.coordinator.current_results()
    }

    /// Returns the underlying coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &Arc<SearchCoordinator> {
        &self.coordinator
    }
}

impl Drop for SearchView {
    fn drop(&mut self) {
        self.debounce.teardown();
        self.pump.abort();
    }
}

// =============================================================================
// Tests
// =============================================================================
