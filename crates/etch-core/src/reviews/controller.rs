// ── Review list controller ──
//
// Drives a `ReviewSource` from declarative filter/sort state. Each public
// operation reduces an action, fetches whatever the new state asks for
// and reduces the result. State never changes while a fetch is awaited,
// and results for superseded requests are dropped by the reducer.

use std::sync::Arc;

use etch_api::{RestClient, TransportConfig};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use super::model::{ReviewFilters, ReviewSort};
use super::query::ReviewQuery;
use super::source::ReviewSource;
use super::state::{PendingFetch, ReviewAction, ReviewListState, reduce};
use super::summary::ReviewSummary;
use crate::config::ReviewListConfig;
use crate::error::CoreError;

/// Message shown when a page fails to load.
pub const LOAD_FAILED: &str = "Failed to load reviews";

/// Paginated, filterable review list for one service.
///
/// Cheaply cloneable via `Arc`.
pub struct ReviewListController<S: ReviewSource> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    source: S,
    service_id: String,
    state: watch::Sender<ReviewListState>,
}

impl<S: ReviewSource> Clone for ReviewListController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ReviewListController<RestClient> {
    /// Build a controller backed by the data store described in `config`.
    pub fn from_config(config: &ReviewListConfig) -> Result<Self, CoreError> {
        Self::from_config_with_view(config, ReviewFilters::default(), ReviewSort::default())
    }

    /// Like [`from_config`](Self::from_config), starting from preset
    /// filters and sort so the first `load()` already applies them.
    pub fn from_config_with_view(
        config: &ReviewListConfig,
        filters: ReviewFilters,
        sort: ReviewSort,
    ) -> Result<Self, CoreError> {
        let transport = TransportConfig::with_timeout(config.timeout);
        let client = RestClient::new(config.base_url.clone(), &config.anon_key, &transport)?;
        let mut initial = ReviewListState::with_page_size(config.page_size);
        initial.filters = filters;
        initial.sort = sort;
        Ok(Self::with_initial_state(
            client,
            config.service_id.clone(),
            initial,
        ))
    }
}

impl<S: ReviewSource> ReviewListController<S> {
    pub fn new(source: S, service_id: impl Into<String>) -> Self {
        Self::with_page_size(source, service_id, ReviewListState::default().page_size)
    }

    pub fn with_page_size(source: S, service_id: impl Into<String>, page_size: u32) -> Self {
        Self::with_initial_state(source, service_id, ReviewListState::with_page_size(page_size))
    }

    /// Start from `initial` (e.g. preset filters and sort) without fetching.
    pub fn with_initial_state(
        source: S,
        service_id: impl Into<String>,
        initial: ReviewListState,
    ) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                source,
                service_id: service_id.into(),
                state,
            }),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.inner.service_id
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn state(&self) -> ReviewListState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReviewListState> {
        self.inner.state.subscribe()
    }

    /// Stream of states, starting with the current one.
    pub fn watch(&self) -> WatchStream<ReviewListState> {
        WatchStream::new(self.subscribe())
    }

    /// Statistics over the currently loaded reviews.
    pub fn summary(&self) -> ReviewSummary {
        ReviewSummary::from_reviews(&self.inner.state.borrow().reviews)
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Fetch the first page for the current filters and sort.
    pub async fn load(&self) -> Result<(), CoreError> {
        self.run(ReviewAction::Refresh).await
    }

    pub async fn set_filters(&self, filters: ReviewFilters) -> Result<(), CoreError> {
        self.run(ReviewAction::SetFilters(filters)).await
    }

    pub async fn set_sort(&self, sort: ReviewSort) -> Result<(), CoreError> {
        self.run(ReviewAction::SetSort(sort)).await
    }

    /// Append the next page. No-op while loading or when nothing is left.
    pub async fn load_more(&self) -> Result<(), CoreError> {
        self.run(ReviewAction::LoadMore).await
    }

    /// Refetch page 1 and replace the list with it.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        self.run(ReviewAction::Refresh).await
    }

    /// Return to the initial state. Any in-flight fetch is discarded.
    pub fn reset(&self) {
        self.dispatch(ReviewAction::Reset);
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn run(&self, action: ReviewAction) -> Result<(), CoreError> {
        let Some((pending, query)) = self.begin(action) else {
            return Ok(());
        };

        debug!(
            service_id = %query.service_id,
            page = pending.page,
            generation = pending.generation,
            sort = %query.sort,
            "fetching reviews"
        );

        match self.inner.source.fetch_page(&query).await {
            Ok(reviews) => {
                let count = reviews.len();
                let applied = self.dispatch(ReviewAction::PageLoaded {
                    generation: pending.generation,
                    reviews,
                });
                if !applied {
                    debug!(generation = pending.generation, "discarded superseded review page");
                }
                debug!(page = pending.page, count, "reviews loaded");
                Ok(())
            }
            Err(e) => {
                warn!(page = pending.page, error = %e, "review fetch failed");
                self.dispatch(ReviewAction::FetchFailed {
                    generation: pending.generation,
                    message: LOAD_FAILED.into(),
                });
                Err(e.into())
            }
        }
    }

    /// Reduce `action`; if it started a fetch, return what to fetch.
    fn begin(&self, action: ReviewAction) -> Option<(PendingFetch, ReviewQuery)> {
        let mut started = None;
        self.inner.state.send_if_modified(|state| {
            let next = reduce(state.clone(), action);
            if next == *state {
                return false;
            }
            if next.generation != state.generation {
                started = next
                    .pending
                    .map(|p| (p, ReviewQuery::for_pending(&self.inner.service_id, &next, p)));
            }
            *state = next;
            true
        });
        started
    }

    /// Reduce `action`, notifying subscribers only if the state changed.
    fn dispatch(&self, action: ReviewAction) -> bool {
        self.inner.state.send_if_modified(|state| {
            let next = reduce(state.clone(), action);
            if next == *state {
                return false;
            }
            *state = next;
            true
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tokio_stream::StreamExt;

    use super::*;
    use crate::reviews::{Review, ReviewUser};

    /// In-memory store honoring filters, sort and paging.
    struct MemorySource {
        rows: Vec<Review>,
        calls: AtomicU32,
        failing_pages: Mutex<HashSet<u32>>,
        /// Simulated latency per sort order.
        latency: fn(ReviewSort) -> Duration,
    }

    impl MemorySource {
        fn new(count: u32) -> Self {
            let rows = (0..count)
                .map(|n| Review {
                    id: format!("r{n}"),
                    service_id: "svc-1".into(),
                    user_id: format!("u{n}"),
                    rating: u8::try_from(n % 5 + 1).unwrap(),
                    comment: format!("review {n}"),
                    response: (n % 2 == 0).then(|| "thanks".to_owned()),
                    created_at: Utc.timestamp_opt(1_700_000_000 + i64::from(n), 0).unwrap(),
                    updated_at: None,
                    user: ReviewUser {
                        id: format!("u{n}"),
                        full_name: format!("User {n}"),
                        avatar_url: None,
                    },
                })
                .collect();
            Self {
                rows,
                calls: AtomicU32::new(0),
                failing_pages: Mutex::new(HashSet::new()),
                latency: |_| Duration::ZERO,
            }
        }

        fn fail_page(&self, page: u32) {
            self.failing_pages.lock().unwrap().insert(page);
        }

        fn heal(&self) {
            self.failing_pages.lock().unwrap().clear();
        }
    }

    impl ReviewSource for Arc<MemorySource> {
        async fn fetch_page(&self, query: &ReviewQuery) -> Result<Vec<Review>, etch_api::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep((self.latency)(query.sort)).await;

            if self.failing_pages.lock().unwrap().contains(&query.page) {
                return Err(etch_api::Error::Server {
                    status: 503,
                    message: "unavailable".into(),
                });
            }

            let mut rows: Vec<Review> = self
                .rows
                .iter()
                .filter(|r| r.service_id == query.service_id)
                .filter(|r| query.filters.rating.is_none_or(|want| r.rating == want))
                .filter(|r| {
                    query
                        .filters
                        .has_response
                        .is_none_or(|want| r.response.is_some() == want)
                })
                .cloned()
                .collect();

            match query.sort {
                ReviewSort::Newest => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
                ReviewSort::Oldest => rows.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
                ReviewSort::Highest => rows.sort_by(|a, b| b.rating.cmp(&a.rating)),
                ReviewSort::Lowest => rows.sort_by(|a, b| a.rating.cmp(&b.rating)),
            }

            let (from, to) = query.range();
            let from = usize::try_from(from).unwrap();
            let to = usize::try_from(to).unwrap();
            Ok(rows.into_iter().skip(from).take(to - from + 1).collect())
        }
    }

    fn controller(count: u32) -> (ReviewListController<Arc<MemorySource>>, Arc<MemorySource>) {
        let source = Arc::new(MemorySource::new(count));
        (ReviewListController::new(Arc::clone(&source), "svc-1"), source)
    }

    #[tokio::test]
    async fn load_fetches_first_page() {
        let (ctrl, _source) = controller(25);
        ctrl.load().await.unwrap();

        let state = ctrl.state();
        assert_eq!(state.reviews.len(), 10);
        assert_eq!(state.page, 1);
        assert!(state.has_more);
        assert!(!state.loading);
        // Newest first.
        assert_eq!(state.reviews[0].id, "r24");
    }

    #[tokio::test]
    async fn load_more_walks_to_the_end() {
        let (ctrl, source) = controller(25);
        ctrl.load().await.unwrap();
        ctrl.load_more().await.unwrap();
        ctrl.load_more().await.unwrap();

        let state = ctrl.state();
        assert_eq!(state.reviews.len(), 25);
        assert_eq!(state.page, 3);
        assert!(!state.has_more);

        ctrl.load_more().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exact_multiple_needs_an_empty_fetch() {
        let (ctrl, source) = controller(20);
        ctrl.load().await.unwrap();
        ctrl.load_more().await.unwrap();
        assert!(ctrl.state().has_more);

        ctrl.load_more().await.unwrap();
        let state = ctrl.state();
        assert_eq!(state.reviews.len(), 20);
        assert!(!state.has_more);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rating_filter_restarts_from_page_one() {
        let (ctrl, _source) = controller(60);
        ctrl.load().await.unwrap();
        ctrl.load_more().await.unwrap();

        ctrl.set_filters(ReviewFilters::rating(5)).await.unwrap();
        let state = ctrl.state();
        assert_eq!(state.page, 1);
        assert_eq!(state.reviews.len(), 10);
        assert!(state.reviews.iter().all(|r| r.rating == 5));
    }

    #[tokio::test]
    async fn response_filter() {
        let (ctrl, _source) = controller(30);
        ctrl.set_filters(ReviewFilters {
            rating: None,
            has_response: Some(false),
        })
        .await
        .unwrap();
        assert!(ctrl.state().reviews.iter().all(|r| r.response.is_none()));
    }

    #[tokio::test]
    async fn sort_changes_order() {
        let (ctrl, _source) = controller(15);
        ctrl.set_sort(ReviewSort::Highest).await.unwrap();
        let state = ctrl.state();
        assert_eq!(state.sort, ReviewSort::Highest);
        assert!(state.reviews.windows(2).all(|w| w[0].rating >= w[1].rating));
    }

    #[tokio::test]
    async fn failed_load_more_preserves_loaded_reviews() {
        let (ctrl, source) = controller(25);
        ctrl.load().await.unwrap();
        let before = ctrl.state().reviews;

        source.fail_page(2);
        let err = ctrl.load_more().await.unwrap_err();
        assert!(matches!(err, CoreError::Api { status: Some(503), .. }));

        let state = ctrl.state();
        assert_eq!(state.reviews, before);
        assert_eq!(state.page, 1);
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some(LOAD_FAILED));

        source.heal();
        ctrl.load_more().await.unwrap();
        let state = ctrl.state();
        assert_eq!(state.reviews.len(), 20);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn refresh_replaces_list() {
        let (ctrl, _source) = controller(25);
        ctrl.load().await.unwrap();
        ctrl.load_more().await.unwrap();
        assert_eq!(ctrl.state().reviews.len(), 20);

        ctrl.refresh().await.unwrap();
        let state = ctrl.state();
        assert_eq!(state.reviews.len(), 10);
        assert_eq!(state.page, 1);
        assert!(state.has_more);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_response_is_discarded() {
        let mut source = MemorySource::new(30);
        source.latency = |sort| match sort {
            ReviewSort::Newest => Duration::from_millis(500),
            _ => Duration::from_millis(10),
        };
        let ctrl = ReviewListController::new(Arc::new(source), "svc-1");

        let slow = ctrl.clone();
        let (first, second) = tokio::join!(slow.load(), async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            ctrl.set_sort(ReviewSort::Oldest).await
        });
        first.unwrap();
        second.unwrap();

        let state = ctrl.state();
        assert_eq!(state.sort, ReviewSort::Oldest);
        assert_eq!(state.reviews[0].id, "r0");
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn initial_state_presets_view() {
        let source = Arc::new(MemorySource::new(40));
        let initial = ReviewListState {
            filters: ReviewFilters::rating(2),
            sort: ReviewSort::Oldest,
            ..ReviewListState::default()
        };
        let ctrl = ReviewListController::with_initial_state(Arc::clone(&source), "svc-1", initial);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        ctrl.load().await.unwrap();
        let state = ctrl.state();
        assert_eq!(state.reviews.len(), 8);
        assert!(state.reviews.iter().all(|r| r.rating == 2));
        assert_eq!(state.reviews[0].id, "r1");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reset_returns_to_initial_state() {
        let (ctrl, _source) = controller(25);
        ctrl.set_sort(ReviewSort::Lowest).await.unwrap();
        ctrl.reset();

        let state = ctrl.state();
        assert!(state.reviews.is_empty());
        assert_eq!(state.sort, ReviewSort::Newest);
        assert_eq!(state.page, 1);
    }

    #[tokio::test]
    async fn watch_stream_sees_loading_then_loaded() {
        let (ctrl, _source) = controller(5);
        let mut stream = ctrl.watch();

        let initial = stream.next().await.unwrap();
        assert!(!initial.loading);

        ctrl.load().await.unwrap();
        let latest = stream.next().await.unwrap();
        assert_eq!(latest.reviews.len(), 5);
        assert!(!latest.has_more);
    }

    #[tokio::test]
    async fn summary_reflects_loaded_reviews() {
        let (ctrl, _source) = controller(10);
        ctrl.load().await.unwrap();
        let summary = ctrl.summary();
        assert_eq!(summary.total_reviews, 10);
        assert_eq!(summary.distribution, [2, 2, 2, 2, 2]);
    }

    #[tokio::test]
    async fn load_more_on_fresh_controller_fetches_first_page() {
        let (ctrl, source) = controller(25);
        ctrl.load_more().await.unwrap();

        let state = ctrl.state();
        assert_eq!(state.page, 1);
        assert!(state.loaded);
        let ids: Vec<&str> = state.reviews.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r24", "r23", "r22", "r21", "r20", "r19", "r18", "r17", "r16", "r15"]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn load_more_after_failed_filter_change_starts_at_page_one() {
        let (ctrl, source) = controller(60);
        ctrl.load().await.unwrap();

        source.fail_page(1);
        ctrl.set_filters(ReviewFilters::rating(5)).await.unwrap_err();
        assert!(ctrl.state().reviews.is_empty());

        source.heal();
        ctrl.load_more().await.unwrap();
        let state = ctrl.state();
        assert_eq!(state.page, 1);
        assert_eq!(state.reviews.len(), 10);
        assert_eq!(state.reviews[0].id, "r59");
        assert!(state.reviews.iter().all(|r| r.rating == 5));

        ctrl.load_more().await.unwrap();
        let state = ctrl.state();
        assert_eq!(state.page, 2);
        assert_eq!(state.reviews.len(), 12);
        assert!(!state.has_more);
    }

    #[tokio::test]
    async fn load_more_after_reset_fetches_first_page() {
        let (ctrl, _source) = controller(25);
        ctrl.load().await.unwrap();
        ctrl.load_more().await.unwrap();
        ctrl.reset();

        ctrl.load_more().await.unwrap();
        let state = ctrl.state();
        assert_eq!(state.page, 1);
        assert_eq!(state.reviews.len(), 10);
        assert_eq!(state.reviews[0].id, "r24");
    }
}
