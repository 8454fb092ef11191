// Feature-flag service client and wire models.

mod client;
mod models;

pub use client::FlagsClient;
pub use models::{DynamicConfig, FlagEnvironment, FlagSnapshot, FlagUser, GateValue};
