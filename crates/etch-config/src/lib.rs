//! Shared configuration for Etch tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `etch_core` runtime configs. The CLI layers its
//! flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use etch_core::{FlagClientConfig, RetryPolicy, ReviewListConfig};

/// Keyring service name all Etch secrets are stored under.
pub const KEYRING_SERVICE: &str = "etch";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' has no {field} configured")]
    Missing { profile: String, field: String },

    #[error("no {credential} configured for profile '{profile}'")]
    NoCredentials { profile: String, credential: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// `explicit`, else the configured default, else `"default"`.
    pub fn active_profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_owned()
    }

    /// Look up a profile, listing the alternatives if it doesn't exist.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| ConfigError::Validation {
            field: "profile".into(),
            reason: format!(
                "'{name}' not found (available: {})",
                self.profile_names()
            ),
        })
    }

    /// Comma-separated profile names, or `(none)`.
    pub fn profile_names(&self) -> String {
        if self.profiles.is_empty() {
            "(none)".into()
        } else {
            self.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_jitter_ms() -> u64 {
    1000
}

/// A named backend profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Data store base URL (e.g. "https://xyz.example.co").
    pub data_url: Option<String>,

    /// Anon key for the data store (plaintext; prefer keyring or env var).
    pub anon_key: Option<String>,

    /// Environment variable name containing the anon key.
    pub anon_key_env: Option<String>,

    /// Feature-flag service base URL.
    pub flags_url: Option<String>,

    /// Flag client key (plaintext; prefer keyring or env var).
    pub client_key: Option<String>,

    /// Environment variable name containing the flag client key.
    pub client_key_env: Option<String>,

    /// User the flags are evaluated for.
    pub user_id: Option<String>,

    /// Deployment tier sent to the flag service.
    pub environment: Option<String>,

    /// Service whose reviews are listed when none is given.
    pub service_id: Option<String>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_jitter_ms: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("app", "etch", "etch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("etch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path`, overlaid with `ETCH_`-prefixed env vars.
///
/// Nested keys use a double underscore: `ETCH_DEFAULTS__TIMEOUT=5`.
/// A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ETCH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "config saved");
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Which secret a profile carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    ClientKey,
    AnonKey,
}

impl Credential {
    /// Fallback environment variable checked when the profile names none.
    pub fn env_var(self) -> &'static str {
        match self {
            Self::ClientKey => "ETCH_CLIENT_KEY",
            Self::AnonKey => "ETCH_ANON_KEY",
        }
    }

    /// Keyring account under [`KEYRING_SERVICE`].
    pub fn keyring_account(self, profile_name: &str) -> String {
        match self {
            Self::ClientKey => format!("{profile_name}/client-key"),
            Self::AnonKey => format!("{profile_name}/anon-key"),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::ClientKey => "flag client key",
            Self::AnonKey => "anon key",
        }
    }

    fn profile_fields(self, profile: &Profile) -> (Option<&str>, Option<&str>) {
        match self {
            Self::ClientKey => (profile.client_key_env.as_deref(), profile.client_key.as_deref()),
            Self::AnonKey => (profile.anon_key_env.as_deref(), profile.anon_key.as_deref()),
        }
    }
}

/// Resolve a secret: profile env var → default env var → keyring → plaintext.
pub fn resolve_credential(
    profile: &Profile,
    profile_name: &str,
    credential: Credential,
) -> Result<SecretString, ConfigError> {
    let (env_name, plaintext) = credential.profile_fields(profile);

    // 1. Env var (profile-named first, then the default)
    for name in env_name.into_iter().chain([credential.env_var()]) {
        if let Ok(val) = std::env::var(name) {
            if !val.is_empty() {
                debug!(env = name, "credential from environment");
                return Ok(SecretString::from(val));
            }
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &credential.keyring_account(profile_name))
    {
        if let Ok(secret) = entry.get_password() {
            debug!("credential from keyring");
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(key) = plaintext {
        return Ok(SecretString::from(key.to_owned()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
        credential: credential.label().into(),
    })
}

pub fn resolve_client_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_credential(profile, profile_name, Credential::ClientKey)
}

pub fn resolve_anon_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_credential(profile, profile_name, Credential::AnonKey)
}

/// Store a secret in the system keyring for `profile_name`.
pub fn store_credential(
    profile_name: &str,
    credential: Credential,
    secret: &str,
) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &credential.keyring_account(profile_name))?;
    entry.set_password(secret)?;
    Ok(())
}

// ── Translation to core configs ─────────────────────────────────────

/// Retry policy from profile overrides falling back to `defaults`.
pub fn retry_policy(profile: &Profile, defaults: &Defaults) -> RetryPolicy {
    RetryPolicy {
        max_retries: profile.max_retries.unwrap_or(defaults.max_retries),
        base_delay: Duration::from_millis(profile.base_delay_ms.unwrap_or(defaults.base_delay_ms)),
        max_jitter: Duration::from_millis(profile.max_jitter_ms.unwrap_or(defaults.max_jitter_ms)),
        ..RetryPolicy::default()
    }
}

fn parse_url(value: Option<&str>, field: &str, profile_name: &str) -> Result<Url, ConfigError> {
    let raw = value.ok_or_else(|| ConfigError::Missing {
        profile: profile_name.into(),
        field: field.into(),
    })?;
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Build a `FlagClientConfig` from a profile. No CLI overrides.
pub fn profile_to_flag_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<FlagClientConfig, ConfigError> {
    let base_url = parse_url(profile.flags_url.as_deref(), "flags_url", profile_name)?;
    let user_id = profile.user_id.clone().ok_or_else(|| ConfigError::Missing {
        profile: profile_name.into(),
        field: "user_id".into(),
    })?;
    let client_key = resolve_client_key(profile, profile_name)?;

    let mut config = FlagClientConfig::new(base_url, client_key, user_id);
    config.environment.clone_from(&profile.environment);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.retry = retry_policy(profile, defaults);
    Ok(config)
}

/// Build a `ReviewListConfig` from a profile.
///
/// `service_id` overrides the profile's default service.
pub fn profile_to_review_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    service_id: Option<&str>,
) -> Result<ReviewListConfig, ConfigError> {
    let base_url = parse_url(profile.data_url.as_deref(), "data_url", profile_name)?;
    let service_id = service_id
        .or(profile.service_id.as_deref())
        .ok_or_else(|| ConfigError::Missing {
            profile: profile_name.into(),
            field: "service_id".into(),
        })?;
    let anon_key = resolve_anon_key(profile, profile_name)?;

    let mut config = ReviewListConfig::new(base_url, anon_key, service_id);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    Ok(config)
}

// ── Tests ───────────────────────────────────────────────────────────
