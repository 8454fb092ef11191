// ── Review list state machine ──
//
// `reduce` is the only place `ReviewListState` changes. Every action that
// starts a fetch bumps `generation` and records the request in `pending`;
// a result is applied only if it carries the pending generation, so
// responses to superseded requests are dropped.

use serde::Serialize;

use super::model::{Review, ReviewFilters, ReviewSort};
use crate::config::REVIEW_PAGE_SIZE;

/// How a fetched page merges into the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    Replace,
    Append,
}

/// The request a state is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingFetch {
    pub generation: u64,
    pub page: u32,
    pub mode: FetchMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewListState {
    pub reviews: Vec<Review>,
    pub loading: bool,
    pub error: Option<String>,
    pub filters: ReviewFilters,
    pub sort: ReviewSort,
    /// Last page merged into `reviews` (1-based).
    pub page: u32,
    /// Whether page 1 for the current filters and sort has been merged.
    pub loaded: bool,
    pub has_more: bool,
    pub page_size: u32,
    pub generation: u64,
    pub pending: Option<PendingFetch>,
}

impl Default for ReviewListState {
    fn default() -> Self {
        Self::with_page_size(REVIEW_PAGE_SIZE)
    }
}

impl ReviewListState {
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            reviews: Vec::new(),
            loading: false,
            error: None,
            filters: ReviewFilters::default(),
            sort: ReviewSort::default(),
            page: 1,
            loaded: false,
            has_more: true,
            page_size: page_size.max(1),
            generation: 0,
            pending: None,
        }
    }

    fn begin(mut self, page: u32, mode: FetchMode) -> Self {
        self.generation += 1;
        self.pending = Some(PendingFetch {
            generation: self.generation,
            page,
            mode,
        });
        self.loading = true;
        self.error = None;
        self
    }

    /// The in-flight request `generation` belongs to, if it is still current.
    fn current(&self, generation: u64) -> Option<PendingFetch> {
        self.pending.filter(|p| p.generation == generation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    /// Replace filters, restart from page 1 with an empty list.
    SetFilters(ReviewFilters),
    /// Replace sort order, restart from page 1 with an empty list.
    SetSort(ReviewSort),
    /// Refetch page 1; existing reviews stay visible until it arrives.
    Refresh,
    /// Fetch the next page and append it. Fetches page 1 instead if the
    /// list has nothing loaded for its current filters and sort.
    LoadMore,
    PageLoaded {
        generation: u64,
        reviews: Vec<Review>,
    },
    FetchFailed {
        generation: u64,
        message: String,
    },
    /// Back to the initial state; any in-flight fetch becomes stale.
    Reset,
}

/// Apply `action` to `state`.
pub fn reduce(state: ReviewListState, action: ReviewAction) -> ReviewListState {
    match action {
        ReviewAction::SetFilters(filters) => ReviewListState {
            filters,
            page: 1,
            loaded: false,
            reviews: Vec::new(),
            has_more: true,
            ..state
        }
        .begin(1, FetchMode::Replace),

        ReviewAction::SetSort(sort) => ReviewListState {
            sort,
            page: 1,
            loaded: false,
            reviews: Vec::new(),
            has_more: true,
            ..state
        }
        .begin(1, FetchMode::Replace),

        ReviewAction::Refresh => state.begin(1, FetchMode::Replace),

        ReviewAction::LoadMore => {
            if state.loading || !state.has_more {
                return state;
            }
            if !state.loaded {
                return state.begin(1, FetchMode::Replace);
            }
            let next = state.page + 1;
            state.begin(next, FetchMode::Append)
        }

        ReviewAction::PageLoaded {
            generation,
            reviews,
        } => {
            let Some(pending) = state.current(generation) else {
                return state;
            };
            let mut state = state;
            state.has_more = reviews.len() == usize::try_from(state.page_size).unwrap_or(usize::MAX);
            match pending.mode {
                FetchMode::Replace => state.reviews = reviews,
                FetchMode::Append => state.reviews.extend(reviews),
            }
            state.page = pending.page;
            state.loaded = true;
            state.loading = false;
            state.error = None;
            state.pending = None;
            state
        }

        ReviewAction::FetchFailed {
            generation,
            message,
        } => {
            if state.current(generation).is_none() {
                return state;
            }
            ReviewListState {
                error: Some(message),
                loading: false,
                pending: None,
                ..state
            }
        }

        ReviewAction::Reset => ReviewListState {
            generation: state.generation + 1,
            ..ReviewListState::with_page_size(state.page_size)
        },
    }
}

// ── Tests ────────────────────────────────────────────────────────────
