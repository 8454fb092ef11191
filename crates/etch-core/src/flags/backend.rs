// Seam between the lifecycle and the remote flag client.

use std::future::Future;

use etch_api::{FlagUser, FlagsClient};
use serde_json::Value;

/// What the lifecycle needs from a flag client.
///
/// Implemented by [`FlagsClient`]; tests plug in scripted fakes.
pub trait FlagBackend: Send + Sync + 'static {
    /// Fetch evaluations for `user`. Resolves when the client is ready.
    fn initialize(&self, user: &FlagUser)
    -> impl Future<Output = Result<(), etch_api::Error>> + Send;

    fn check_gate(&self, name: &str) -> bool;

    /// `None` if not initialized or no config is named `name`.
    fn dynamic_config(&self, name: &str) -> Option<Value>;

    /// Tear down the connection. Called at most once by the lifecycle.
    fn shutdown(&self);
}

impl FlagBackend for FlagsClient {
    async fn initialize(&self, user: &FlagUser) -> Result<(), etch_api::Error> {
        FlagsClient::initialize(self, user).await
    }

    fn check_gate(&self, name: &str) -> bool {
        FlagsClient::check_gate(self, name).unwrap_or(false)
    }

    fn dynamic_config(&self, name: &str) -> Option<Value> {
        FlagsClient::dynamic_config(self, name).ok().flatten().map(|c| c.value)
    }

    fn shutdown(&self) {
        FlagsClient::shutdown(self);
    }
}
