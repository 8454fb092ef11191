// etch-api: Async clients for the feature-flag service and the review data store

pub mod error;
pub mod flags;
pub mod rest;
pub mod transport;

pub use error::Error;
pub use flags::{DynamicConfig, FlagSnapshot, FlagUser, FlagsClient};
pub use rest::{Query, RestClient};
pub use transport::TransportConfig;
