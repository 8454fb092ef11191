//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use etch_config::ConfigError;
use etch_core::{CoreError, FlagErrorKind};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const RATE_LIMITED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(dead_code)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(etch::connection_failed),
        help(
            "Check that the service is reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error(
        "Rate limited by remote service{}",
        .retry_after_secs.map(|s| format!(" (retry after {s}s)")).unwrap_or_default()
    )]
    #[diagnostic(code(etch::rate_limited), help("Wait a moment and try again."))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(etch::timeout),
        help("Increase timeout with --timeout or check service responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(etch::auth_failed),
        help(
            "Verify the key for this profile.\n\
             Run: etch config set-key client   (or: etch config set-key anon)"
        )
    )]
    AuthFailed { message: String },

    #[error("No {credential} configured for profile '{profile}'")]
    #[diagnostic(
        code(etch::no_credentials),
        help(
            "Configure credentials with: etch config init\n\
             Or set ETCH_CLIENT_KEY / ETCH_ANON_KEY."
        )
    )]
    NoCredentials { profile: String, credential: String },

    // ── Flags ────────────────────────────────────────────────────────
    #[error("Flag client failed to initialize ({kind}): {message}")]
    #[diagnostic(
        code(etch::flag_init),
        help("Run with -v to see each attempt, or raise --max-retries.")
    )]
    FlagInit { kind: FlagErrorKind, message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(etch::api_error))]
    ApiError {
        code: String,
        message: String,
        status: Option<u16>,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(etch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(etch::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: etch config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Profile '{profile}' has no {field} configured")]
    #[diagnostic(
        code(etch::missing_setting),
        help(
            "Set it with: etch config set {field} <value>\n\
             Or pass it on the command line (see --help)."
        )
    )]
    MissingSetting { profile: String, field: String },

    #[error(transparent)]
    #[diagnostic(code(etch::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {reason}")]
    #[diagnostic(
        code(etch::keyring),
        help("Store the key in the config file or an environment variable instead.")
    )]
    Keyring { reason: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::RateLimited { .. } => exit_code::RATE_LIMITED,
            Self::Validation { .. } | Self::MissingSetting { .. } => exit_code::USAGE,
            Self::FlagInit { kind, .. } => match kind {
                FlagErrorKind::Config => exit_code::AUTH,
                FlagErrorKind::Network => exit_code::CONNECTION,
                FlagErrorKind::Timeout => exit_code::TIMEOUT,
                FlagErrorKind::RateLimit => exit_code::RATE_LIMITED,
                _ => exit_code::GENERAL,
            },
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::RateLimited { retry_after_secs } => CliError::RateLimited { retry_after_secs },

            CoreError::FlagInitialization { kind, message } => CliError::FlagInit { kind, message },

            CoreError::FlagClientShutDown => CliError::ApiError {
                code: "shut_down".into(),
                message: "flag client was shut down".into(),
                status: None,
            },

            CoreError::Api {
                message,
                code,
                status,
            } => CliError::ApiError {
                code: code
                    .or_else(|| status.map(|s| s.to_string()))
                    .unwrap_or_else(|| "unknown".into()),
                message,
                status,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                code: "internal".into(),
                message,
                status: None,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Missing { profile, field } => CliError::MissingSetting { profile, field },
            ConfigError::NoCredentials {
                profile,
                credential,
            } => CliError::NoCredentials {
                profile,
                credential,
            },
            ConfigError::Keyring(e) => CliError::Keyring {
                reason: e.to_string(),
            },
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
