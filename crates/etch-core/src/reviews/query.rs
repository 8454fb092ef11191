// A single page request derived from list state.

use super::model::{ReviewFilters, ReviewSort};
use super::state::{PendingFetch, ReviewListState};

/// Everything a [`ReviewSource`](super::ReviewSource) needs to fetch one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewQuery {
    pub service_id: String,
    pub filters: ReviewFilters,
    pub sort: ReviewSort,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
}

impl ReviewQuery {
    pub(crate) fn for_pending(
        service_id: &str,
        state: &ReviewListState,
        pending: PendingFetch,
    ) -> Self {
        Self {
            service_id: service_id.to_owned(),
            filters: state.filters,
            sort: state.sort,
            page: pending.page,
            page_size: state.page_size,
        }
    }

    /// Inclusive zero-based row range `[(page-1)*size, page*size - 1]`.
    pub fn range(&self) -> (u64, u64) {
        let size = u64::from(self.page_size.max(1));
        let page = u64::from(self.page.max(1));
        ((page - 1) * size, page * size - 1)
    }
}
