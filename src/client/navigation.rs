//! Rendering of result entries and navigation to profile pages.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::{RecordKey, SearchResultRecord};

/// Route prefix of the profile page.
pub const PROFILE_ROUTE_PREFIX: &str = "/profiles/";

/// Placeholder shown when a search matched nothing.
pub const NO_RESULTS_MESSAGE: &str = "No results found";

/// One rendered result row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry {
    /// Stable identity used to key the row.
    pub key: RecordKey,
    /// `"<name> @<username>"`.
    pub line: String,
    /// Relevance and verification details.
    pub detail: String,
    /// Avatar URL, if any.
    pub image_url: Option<String>,
    /// Route opened when the row is selected.
    pub route: Option<String>,
}

impl ResultEntry {
    /// Builds the row for `record`.
    #[must_use]
    pub fn from_record(record: &SearchResultRecord) -> Self {
        Self {
            key: record.key(),
            line: display_line(record),
            detail: detail_line(record),
            image_url: record.image_url.clone(),
            route: profile_route(record),
        }
    }
}

/// Formats the main line of a result, e.g. `"Juan Perez @juamez"`.
#[must_use]
pub fn display_line(record: &SearchResultRecord) -> String {
    let name = if record.name.is_empty() {
        "Unknown"
    } else {
        record.name.as_str()
    };
    let username = record
        .username
        .as_deref()
        .filter(|username| !username.is_empty())
        .unwrap_or("No username");
    format!("{name} @{username}")
}

/// Formats the secondary line: rounded page rank and a verified mark.
///
/// Halves round away from zero, so `2.5` shows as `3`.
#[must_use]
pub fn detail_line(record: &SearchResultRecord) -> String {
    let rank = record
        .page_rank
        .map_or_else(|| "N/A".to_string(), |rank| format!("{:.0}", rank.round()));
    if record.verified == Some(true) {
        format!("PageRank: {rank} ✓ Verified")
    } else {
        format!("PageRank: {rank}")
    }
}

/// Returns the profile route of `record`.
///
/// Uses the username, or the name when the username is missing. Returns
/// `None` when both are empty.
#[must_use]
pub fn profile_route(record: &SearchResultRecord) -> Option<String> {
    let target = record
        .username
        .as_deref()
        .filter(|username| !username.is_empty())
        .or_else(|| Some(record.name.as_str()).filter(|name| !name.is_empty()))?;
    Some(format!("{PROFILE_ROUTE_PREFIX}{}", urlencoding::encode(target)))
}

// =============================================================================
// Render Target
// =============================================================================

/// Surface that displays results and performs navigation.
pub trait RenderTarget: Send + Sync {
    /// Shows the given rows. An empty slice means "no results".
    fn render(&self, entries: &[ResultEntry]);

    /// Opens `route`.
    fn navigate(&self, route: &str);
}

/// Routes search results to a [`RenderTarget`].
pub struct NavigationDispatch {
    target: Arc<dyn RenderTarget>,
}

impl NavigationDispatch {
    /// Creates a dispatcher for `target`.
    #[must_use]
    pub fn new(target: Arc<dyn RenderTarget>) -> Self {
        Self { target }
    }

    /// Renders `results` and returns the rows shown.
    pub fn show(&self, results: &[SearchResultRecord]) -> Vec<ResultEntry> {
        let entries: Vec<ResultEntry> = results.iter().map(ResultEntry::from_record).collect();
        self.target.render(&entries);
        entries
    }

    /// Navigates to the profile of `record`.
    ///
    /// Returns the route taken, or `None` if the record has neither a
    /// username nor a name.
    pub fn select(&self, record: &SearchResultRecord) -> Option<String> {
        let Some(route) = profile_route(record) else {
            tracing::warn!(key = %record.key(), "Selected record has no profile route");
            return None;
        };
        tracing::debug!(%route, "Navigating to profile");
        self.target.navigate(&route);
        Some(route)
    }
}

/// [`RenderTarget`] that records what it is asked to do.
#[derive(Default)]
pub struct RecordingRenderTarget {
    rendered: Mutex<Vec<String>>,
    routes: Mutex<Vec<String>>,
}

impl RecordingRenderTarget {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines of the last render, with the placeholder for an empty list.
    #[must_use]
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().clone()
    }

    /// Every route navigated to, in order.
    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().clone()
    }
}

impl RenderTarget for RecordingRenderTarget {
    fn render(&self, entries: &[ResultEntry]) {
        let lines = if entries.is_empty() {
            vec![NO_RESULTS_MESSAGE.to_string()]
        } else {
            entries.iter().map(|entry| entry.line.clone()).collect()
        };
        *self.rendered.lock() = lines;
    }

    fn navigate(&self, route: &str) {
        self.routes.lock().push(route.to_string());
    }
}
