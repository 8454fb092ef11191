// Feature-flag service HTTP client
//
// One initialize round-trip fetches every gate and dynamic config for a
// user; reads afterwards are served from the cached snapshot.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use super::models::{DynamicConfig, FlagEnvironment, FlagSnapshot, FlagUser, InitializeRequest};
use crate::error::Error;
use crate::transport::{self, TransportConfig};

const CLIENT_KEY_HEADER: &str = "X-Client-Key";

/// HTTP client for the remote feature-flag service.
///
/// Construct it, call [`initialize`](Self::initialize) once, then read gates
/// and configs synchronously. [`shutdown`](Self::shutdown) drops the cached
/// snapshot; reads after that return [`Error::NotInitialized`].
pub struct FlagsClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    environment: Option<FlagEnvironment>,
    snapshot: RwLock<Option<FlagSnapshot>>,
}

impl FlagsClient {
    /// Create a client that sends `client_key` on every request.
    pub fn new(
        base_url: Url,
        client_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(client_key.expose_secret()).map_err(|_| {
            Error::InvalidClientKey {
                message: "client key contains characters not allowed in a header".into(),
            }
        })?;
        key.set_sensitive(true);
        headers.insert(CLIENT_KEY_HEADER, key);

        Ok(Self {
            http: transport.build_client(headers)?,
            base_url,
            timeout: transport.timeout,
            environment: None,
            snapshot: RwLock::new(None),
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout: TransportConfig::default().timeout,
            environment: None,
            snapshot: RwLock::new(None),
        }
    }

    /// Attach a deployment tier to initialize requests.
    pub fn with_environment(mut self, tier: impl Into<String>) -> Self {
        self.environment = Some(FlagEnvironment { tier: tier.into() });
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch all evaluations for `user` and cache them.
    pub async fn initialize(&self, user: &FlagUser) -> Result<(), Error> {
        let url = self.url("v1/initialize")?;
        debug!(user_id = %user.user_id, "POST {}", url);

        let body = InitializeRequest {
            user,
            environment: self.environment.as_ref(),
        };
        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport::send_error(e, self.timeout))?;

        let resp = transport::error_for_status(resp).await.map_err(|e| match e {
            Error::Unauthorized { message } => Error::InvalidClientKey { message },
            other => other,
        })?;

        let mut snapshot: FlagSnapshot = transport::read_json(resp, self.timeout).await?;
        if let Some(message) = snapshot.error.take() {
            return Err(Error::Sdk { message });
        }

        debug!(
            gates = snapshot.feature_gates.len(),
            configs = snapshot.dynamic_configs.len(),
            "flag snapshot cached"
        );
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
        Ok(())
    }

    /// Whether a snapshot is cached.
    pub fn is_ready(&self) -> bool {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Evaluate a gate. Unknown gates are `false`.
    pub fn check_gate(&self, name: &str) -> Result<bool, Error> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .map(|s| s.gate(name))
            .ok_or(Error::NotInitialized)
    }

    /// Look up a dynamic config. `Ok(None)` if the snapshot has no config
    /// named `name`.
    pub fn dynamic_config(&self, name: &str) -> Result<Option<DynamicConfig>, Error> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        let snapshot = guard.as_ref().ok_or(Error::NotInitialized)?;
        Ok(snapshot.config(name).cloned())
    }

    /// Drop the cached snapshot. Returns `false` if there was nothing to drop.
    pub fn shutdown(&self) -> bool {
        let dropped = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if dropped {
            debug!("flag client shut down");
        }
        dropped
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}
