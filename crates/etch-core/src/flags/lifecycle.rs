// ── Flag client lifecycle ──
//
// Initializes a remote flag client exactly once, retrying transient
// failures with exponential backoff. State is published on a watch
// channel; `shutdown()` cancels any pending retry and tears the client
// down once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use etch_api::{FlagUser, FlagsClient, TransportConfig};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::FlagBackend;
use super::error_kind::FlagErrorKind;
use super::state::{FlagClientState, FlagStatus};
use crate::config::FlagClientConfig;
use crate::error::CoreError;
use crate::retry::RetryPolicy;

/// Owns a flag client from construction to teardown.
///
/// Cheaply cloneable via `Arc`. Call [`initialize`](Self::initialize) (or
/// [`start`](Self::start) to run it in the background), read flags once the
/// state reaches `success`, and call [`shutdown`](Self::shutdown) when the
/// owner goes away.
pub struct FlagClientLifecycle<B: FlagBackend> {
    inner: Arc<Inner<B>>,
}

struct Inner<B> {
    backend: B,
    user: FlagUser,
    policy: RetryPolicy,
    state: watch::Sender<FlagClientState>,
    started: AtomicBool,
    torn_down: AtomicBool,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<B: FlagBackend> Clone for FlagClientLifecycle<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl FlagClientLifecycle<FlagsClient> {
    /// Build the HTTP flag client described by `config`.
    pub fn from_config(config: &FlagClientConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig::with_timeout(config.timeout);
        let mut client =
            FlagsClient::new(config.base_url.clone(), &config.client_key, &transport)?;
        if let Some(tier) = &config.environment {
            client = client.with_environment(tier.clone());
        }
        Ok(Self::new(
            client,
            FlagUser::new(config.user_id.clone()),
            config.retry,
        ))
    }
}

impl<B: FlagBackend> FlagClientLifecycle<B> {
    /// Wrap `backend`. Does not contact the service until initialized.
    pub fn new(backend: B, user: FlagUser, policy: RetryPolicy) -> Self {
        let (state, _) = watch::channel(FlagClientState::default());
        Self {
            inner: Arc::new(Inner {
                backend,
                user,
                policy,
                state,
                started: AtomicBool::new(false),
                torn_down: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> FlagClientState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<FlagClientState> {
        self.inner.state.subscribe()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    // ── Initialization ───────────────────────────────────────────────

    /// Initialize the client, retrying retryable failures per the policy.
    ///
    /// Only the first call drives the retry loop. Concurrent and later
    /// callers wait for (or immediately get) the same outcome.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::FlagClientShutDown);
        }
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return self.wait_for_outcome().await;
        }
        self.run().await
    }

    /// Run [`initialize`](Self::initialize) on a background task.
    ///
    /// The outcome is observable through [`state`](Self::state) and
    /// [`subscribe`](Self::subscribe). No-op after shutdown or if a task is
    /// already running.
    pub fn start(&self) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        let mut task = self.inner.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return;
        }
        let this = self.clone();
        *task = Some(tokio::spawn(async move {
            if let Err(e) = this.initialize().await {
                debug!(error = %e, "background flag initialization ended without a client");
            }
        }));
    }

    async fn run(&self) -> Result<(), CoreError> {
        let inner = &self.inner;
        inner.state.send_modify(|s| s.status = FlagStatus::Loading);
        debug!(user_id = %inner.user.user_id, "initializing flag client");

        loop {
            let attempt = tokio::select! {
                biased;
                () = inner.cancel.cancelled() => {
                    inner.publish_shut_down();
                    return Err(CoreError::FlagClientShutDown);
                }
                result = inner.backend.initialize(&inner.user) => result,
            };

            let Err(err) = attempt else {
                inner.state.send_modify(|s| {
                    s.status = FlagStatus::Success;
                    s.error = None;
                });
                info!(retries = inner.state.borrow().retry_count, "flag client ready");
                return Ok(());
            };

            let kind = FlagErrorKind::from_api_error(&err);
            let message = err.to_string();
            let retry_count = inner.state.borrow().retry_count;

            if !inner.policy.should_retry(kind, retry_count) {
                inner.state.send_modify(|s| {
                    s.status = FlagStatus::Error;
                    s.error = Some(message.clone());
                    s.last_error_type = Some(kind);
                });
                warn!(%kind, retry_count, error = %message, "flag client initialization failed");
                return Err(CoreError::FlagInitialization { kind, message });
            }

            let delay = inner.policy.delay_for(retry_count);
            inner.state.send_modify(|s| {
                s.error = Some(message.clone());
                s.last_error_type = Some(kind);
            });
            debug!(
                %kind,
                attempt = retry_count + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %message,
                "flag client initialization failed, retrying"
            );

            tokio::select! {
                biased;
                () = inner.cancel.cancelled() => {
                    debug!("retry cancelled by shutdown");
                    inner.publish_shut_down();
                    return Err(CoreError::FlagClientShutDown);
                }
                () = tokio::time::sleep(delay) => {}
            }

            inner.state.send_modify(|s| {
                s.retry_count += 1;
                s.status = FlagStatus::Loading;
            });
        }
    }

    async fn wait_for_outcome(&self) -> Result<(), CoreError> {
        let mut rx = self.inner.state.subscribe();
        let settled = async {
            let state = rx.wait_for(|s| s.status.is_terminal()).await?;
            Ok::<_, watch::error::RecvError>(state.clone())
        };
        let state = tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => return Err(CoreError::FlagClientShutDown),
            result = settled => result.map_err(|_| CoreError::FlagClientShutDown)?,
        };

        match state.status {
            FlagStatus::Success => Ok(()),
            _ => Err(CoreError::FlagInitialization {
                kind: state.last_error_type.unwrap_or(FlagErrorKind::Unknown),
                message: state.error.unwrap_or_default(),
            }),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    fn live(&self) -> bool {
        !self.inner.torn_down.load(Ordering::SeqCst) && self.inner.state.borrow().is_ready()
    }

    /// The underlying client, only once initialization succeeded.
    pub fn backend(&self) -> Option<&B> {
        self.live().then_some(&self.inner.backend)
    }

    /// Gate value; `false` unless the client is ready.
    pub fn check_gate(&self, name: &str) -> bool {
        self.backend().is_some_and(|b| b.check_gate(name))
    }

    /// Raw dynamic config; `None` unless the client is ready and has a
    /// config named `name`.
    pub fn dynamic_config(&self, name: &str) -> Option<Value> {
        self.backend().and_then(|b| b.dynamic_config(name))
    }

    /// Dynamic config decoded into `T`; `None` if unavailable or mismatched.
    pub fn dynamic_config_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let value = self.dynamic_config(name)?;
        serde_json::from_value(value)
            .inspect_err(|e| debug!(config = name, error = %e, "dynamic config did not decode"))
            .ok()
    }

    // ── Teardown ─────────────────────────────────────────────────────

    /// Cancel any pending retry, join the background task and tear the
    /// client down. Safe to call more than once.
    pub async fn shutdown(&self) {
        if self.inner.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.cancel.cancel();

        let handle = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "flag initialization task did not exit cleanly");
            }
        }

        self.inner.publish_shut_down();
        self.inner.backend.shutdown();
        debug!("flag client lifecycle shut down");
    }
}

impl<B> Inner<B> {
    /// Move an unfinished initialization to `error` so subscribers never
    /// wait on `loading` after teardown. Settled and idle states are kept.
    fn publish_shut_down(&self) {
        self.state.send_if_modified(|s| {
            if s.status != FlagStatus::Loading {
                return false;
            }
            s.status = FlagStatus::Error;
            s.error = Some(CoreError::FlagClientShutDown.to_string());
            true
        });
    }
}

// ── Tests ────────────────────────────────────────────────────────────
