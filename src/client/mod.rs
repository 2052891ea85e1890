//! Client-side search and profile flows.
//!
//! These types drive a search view against the proxy endpoints: debounced
//! input, stale-response filtering, profile fetching and navigation.

pub mod coordinator;
pub mod debounce;
pub mod fetch;
pub mod navigation;

pub use coordinator::{
    BackendError, DispatchOutcome, HttpSearchBackend, SearchBackend, SearchCoordinator, SearchView,
};
pub use debounce::{DEFAULT_DEBOUNCE_DELAY, DebounceController};
pub use fetch::{FETCH_FAILED_MESSAGE, FetchRequest, FetchState, ProfileFetch};
pub use navigation::{
    NO_RESULTS_MESSAGE, NavigationDispatch, PROFILE_ROUTE_PREFIX, RecordingRenderTarget,
    RenderTarget, ResultEntry, detail_line, display_line, profile_route,
};
