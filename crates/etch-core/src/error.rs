// ── Core error types ──
//
// Domain errors from etch-core. Consumers never match on HTTP details
// directly; the `From<etch_api::Error>` impl folds transport failures into
// domain variants.

use thiserror::Error;

use crate::flags::FlagErrorKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Rate limited by remote service")]
    RateLimited { retry_after_secs: Option<u64> },

    // ── Flag client errors ───────────────────────────────────────────
    /// Initialization ended in the terminal `error` state.
    #[error("Flag client initialization failed ({kind}): {message}")]
    FlagInitialization { kind: FlagErrorKind, message: String },

    #[error("Flag client has been shut down")]
    FlagClientShutDown,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Service-specific error code (e.g. `PGRST100`).
        code: Option<String>,
        status: Option<u16>,
    },

    // ── Configuration / validation ───────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<etch_api::Error> for CoreError {
    fn from(err: etch_api::Error) -> Self {
        match err {
            etch_api::Error::InvalidClientKey { message }
            | etch_api::Error::Unauthorized { message } => {
                CoreError::AuthenticationFailed { message }
            }
            etch_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            etch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            etch_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            etch_api::Error::RateLimited { retry_after_secs } => {
                CoreError::RateLimited { retry_after_secs }
            }
            etch_api::Error::Server { status, message } => CoreError::Api {
                message,
                code: None,
                status: Some(status),
            },
            etch_api::Error::Api {
                message,
                code,
                status,
            } => CoreError::Api {
                message,
                code,
                status: Some(status),
            },
            etch_api::Error::Sdk { message } => CoreError::Api {
                message,
                code: None,
                status: None,
            },
            etch_api::Error::NotInitialized => {
                CoreError::Internal("flag client read before initialization".into())
            }
            etch_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_fold_together() {
        let a: CoreError = etch_api::Error::InvalidClientKey {
            message: "bad key".into(),
        }
        .into();
        let b: CoreError = etch_api::Error::Unauthorized {
            message: "jwt expired".into(),
        }
        .into();
        assert!(matches!(a, CoreError::AuthenticationFailed { .. }));
        assert!(matches!(b, CoreError::AuthenticationFailed { .. }));
    }

    #[test]
    fn server_errors_keep_status() {
        let err: CoreError = etch_api::Error::Server {
            status: 503,
            message: "unavailable".into(),
        }
        .into();
        match err {
            CoreError::Api { status, .. } => assert_eq!(status, Some(503)),
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn flag_initialization_message_names_kind() {
        let err = CoreError::FlagInitialization {
            kind: FlagErrorKind::Config,
            message: "invalid client key".into(),
        };
        assert_eq!(
            err.to_string(),
            "Flag client initialization failed (config): invalid client key"
        );
    }
}
