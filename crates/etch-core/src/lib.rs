// etch-core: Flag-client lifecycle and review-list state between etch-api and consumers.

pub mod config;
pub mod error;
pub mod flags;
pub mod retry;
pub mod reviews;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{FlagClientConfig, ReviewListConfig};
pub use error::CoreError;
pub use flags::{FlagBackend, FlagClientLifecycle, FlagClientState, FlagErrorKind, FlagStatus};
pub use retry::RetryPolicy;
pub use reviews::{
    Review, ReviewAction, ReviewFilters, ReviewListController, ReviewListState, ReviewSort,
    ReviewSource, ReviewSummary, ReviewUser,
};
