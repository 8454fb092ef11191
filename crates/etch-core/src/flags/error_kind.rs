// Failure taxonomy for flag-client initialization.
//
// Structured transport errors are classified by variant; anything else
// (including errors the flag service reports in-band) falls back to
// substring matching on the message.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Why a flag-client initialization attempt failed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlagErrorKind {
    Network,
    Timeout,
    Config,
    RateLimit,
    ServerError,
    Initialization,
    Unknown,
}

// Checked in order; the first table with a hit wins.
const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "too many requests", "429"];
const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out"];
const NETWORK_MARKERS: &[&str] = &["network", "fetch", "connection", "offline", "dns", "socket"];
const SERVER_ERROR_MARKERS: &[&str] = &[
    "server error",
    "internal server",
    "service unavailable",
    "bad gateway",
    "500",
    "502",
    "503",
    "504",
];
const CONFIG_MARKERS: &[&str] = &[
    "config",
    "client key",
    "sdk key",
    "api key",
    "invalid key",
    "unauthorized",
    "forbidden",
    "401",
    "403",
];
const INITIALIZATION_MARKERS: &[&str] = &["initializ", "not ready"];

impl FlagErrorKind {
    /// Bucket a free-form error message.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let hit = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

        if hit(RATE_LIMIT_MARKERS) {
            Self::RateLimit
        } else if hit(TIMEOUT_MARKERS) {
            Self::Timeout
        } else if hit(NETWORK_MARKERS) {
            Self::Network
        } else if hit(SERVER_ERROR_MARKERS) {
            Self::ServerError
        } else if hit(CONFIG_MARKERS) {
            Self::Config
        } else if hit(INITIALIZATION_MARKERS) {
            Self::Initialization
        } else {
            Self::Unknown
        }
    }

    /// Classify a transport error, preferring its structure over its text.
    pub fn from_api_error(err: &etch_api::Error) -> Self {
        use etch_api::Error;

        match err {
            Error::Timeout { .. } => Self::Timeout,
            Error::Transport(e) if e.is_timeout() => Self::Timeout,
            Error::Transport(e) if e.is_connect() => Self::Network,
            Error::RateLimited { .. } => Self::RateLimit,
            Error::Server { .. } => Self::ServerError,
            Error::Api { status: 408, .. } => Self::Timeout,
            Error::InvalidClientKey { .. } | Error::Unauthorized { .. } | Error::InvalidUrl(_) => {
                Self::Config
            }
            Error::Sdk { message } => Self::classify(message),
            other => Self::classify(&other.to_string()),
        }
    }

    /// `config` and `unknown` are terminal; everything else may be retried.
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Config | Self::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_buckets() {
        let cases = [
            ("TypeError: Failed to fetch", FlagErrorKind::Network),
            ("Network request failed", FlagErrorKind::Network),
            ("request timed out", FlagErrorKind::Timeout),
            ("Rate limit exceeded", FlagErrorKind::RateLimit),
            ("HTTP 503 Service Unavailable", FlagErrorKind::ServerError),
            ("Invalid client key provided", FlagErrorKind::Config),
            ("Client not ready", FlagErrorKind::Initialization),
            ("Failed to initialize", FlagErrorKind::Initialization),
            ("something odd happened", FlagErrorKind::Unknown),
        ];
        for (message, expected) in cases {
            assert_eq!(FlagErrorKind::classify(message), expected, "{message}");
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(FlagErrorKind::classify("TIMEOUT"), FlagErrorKind::Timeout);
    }

    #[test]
    fn earlier_buckets_win() {
        assert_eq!(
            FlagErrorKind::classify("initialize failed: network unreachable"),
            FlagErrorKind::Network
        );
        assert_eq!(
            FlagErrorKind::classify("timed out after 1500ms"),
            FlagErrorKind::Timeout
        );
    }

    #[test]
    fn structured_errors_are_classified_by_variant() {
        use etch_api::Error;

        assert_eq!(
            FlagErrorKind::from_api_error(&Error::Timeout { timeout_secs: 5 }),
            FlagErrorKind::Timeout
        );
        assert_eq!(
            FlagErrorKind::from_api_error(&Error::RateLimited {
                retry_after_secs: None
            }),
            FlagErrorKind::RateLimit
        );
        assert_eq!(
            FlagErrorKind::from_api_error(&Error::Server {
                status: 500,
                message: "boom".into()
            }),
            FlagErrorKind::ServerError
        );
        assert_eq!(
            FlagErrorKind::from_api_error(&Error::InvalidClientKey {
                message: "nope".into()
            }),
            FlagErrorKind::Config
        );
        assert_eq!(
            FlagErrorKind::from_api_error(&Error::Sdk {
                message: "Failed to fetch".into()
            }),
            FlagErrorKind::Network
        );
    }

    #[test]
    fn retryability() {
        for kind in [
            FlagErrorKind::Network,
            FlagErrorKind::Timeout,
            FlagErrorKind::RateLimit,
            FlagErrorKind::ServerError,
            FlagErrorKind::Initialization,
        ] {
            assert!(kind.is_retryable(), "{kind}");
        }
        assert!(!FlagErrorKind::Config.is_retryable());
        assert!(!FlagErrorKind::Unknown.is_retryable());
    }

    #[test]
    fn names_are_snake_case() {
        assert_eq!(FlagErrorKind::RateLimit.to_string(), "rate_limit");
        assert_eq!("server_error".parse::<FlagErrorKind>().ok(), Some(FlagErrorKind::ServerError));
    }
}
