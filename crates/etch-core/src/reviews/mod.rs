// Paginated review list: domain types, reducer, controller and summary.

mod controller;
mod model;
mod query;
mod source;
mod state;
mod summary;

pub use controller::{LOAD_FAILED, ReviewListController};
pub use model::{Review, ReviewFilters, ReviewSort, ReviewUser};
pub use query::ReviewQuery;
pub use source::{RESPONSE_COLUMN, REVIEW_COLUMNS, REVIEWS_TABLE, ReviewSource};
pub use state::{FetchMode, PendingFetch, ReviewAction, ReviewListState, reduce};
pub use summary::ReviewSummary;
