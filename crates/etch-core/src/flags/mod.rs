// Remote feature-flag client lifecycle.

mod backend;
mod error_kind;
mod lifecycle;
mod state;

pub use backend::FlagBackend;
pub use error_kind::FlagErrorKind;
pub use lifecycle::FlagClientLifecycle;
pub use state::{FlagClientState, FlagStatus};
