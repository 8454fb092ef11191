use thiserror::Error;

/// Top-level error type for the `etch-api` crate.
///
/// Covers every failure mode across both remote surfaces:
/// transport, the feature-flag service, and the REST data store.
/// `etch-core` maps these into user-facing diagnostics and flag error kinds.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The flag service rejected the client key (HTTP 401/403).
    #[error("Invalid client key: {message}")]
    InvalidClientKey { message: String },

    /// The data store rejected the anon key or bearer token.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Service responses ───────────────────────────────────────────
    /// HTTP 429. Includes retry-after in seconds when the server sent one.
    #[error("Rate limited (HTTP 429)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP 5xx from either service.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-success response, with the service's error code if present.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: u16,
    },

    /// Error reported by the flag service inside an HTTP 200 body.
    #[error("Flag SDK error: {message}")]
    Sdk { message: String },

    // ── Flag client ─────────────────────────────────────────────────
    /// Gate or config read before `initialize()` completed (or after shutdown).
    #[error("Flag client is not initialized")]
    NotInitialized,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::RateLimited { .. } | Self::Server { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the credentials were rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidClientKey { .. } | Self::Unauthorized { .. }
        )
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::RateLimited { .. } => Some(429),
            Self::Server { status, .. } | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Extract the API error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
