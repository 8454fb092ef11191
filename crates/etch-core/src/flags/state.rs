// Observable state of a flag-client lifecycle.

use serde::Serialize;
use strum::Display;

use super::FlagErrorKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlagStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl FlagStatus {
    /// `success` and `error` end the lifecycle; nothing transitions out of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// Snapshot published on every lifecycle transition.
///
/// While a retry is pending the status stays `loading`, with `error` and
/// `last_error_type` describing the attempt that just failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlagClientState {
    pub status: FlagStatus,
    pub error: Option<String>,
    pub retry_count: u32,
    pub last_error_type: Option<FlagErrorKind>,
}

impl FlagClientState {
    pub fn is_ready(&self) -> bool {
        self.status == FlagStatus::Success
    }
}
