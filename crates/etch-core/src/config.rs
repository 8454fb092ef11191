// ── Runtime configuration ──
//
// These types describe how to reach the remote services and how hard to
// retry. They carry credentials but never touch disk; the CLI builds them
// from etch-config profiles and hands them in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::retry::RetryPolicy;

/// Default page size of the review list.
pub const REVIEW_PAGE_SIZE: u32 = 10;

/// Everything a [`FlagClientLifecycle`](crate::FlagClientLifecycle) needs
/// to build and initialize its client.
#[derive(Debug, Clone)]
pub struct FlagClientConfig {
    /// Flag service base URL.
    pub base_url: Url,
    pub client_key: SecretString,
    /// User the gates are evaluated for.
    pub user_id: String,
    /// Deployment tier (`development`, `production`, ...).
    pub environment: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl FlagClientConfig {
    pub fn new(base_url: Url, client_key: SecretString, user_id: impl Into<String>) -> Self {
        Self {
            base_url,
            client_key,
            user_id: user_id.into(),
            environment: None,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Connection settings for a [`ReviewListController`](crate::ReviewListController).
#[derive(Debug, Clone)]
pub struct ReviewListConfig {
    /// Data store base URL (the REST surface lives under `/rest/v1`).
    pub base_url: Url,
    pub anon_key: SecretString,
    /// Service whose reviews are listed.
    pub service_id: String,
    pub page_size: u32,
    pub timeout: Duration,
}

impl ReviewListConfig {
    pub fn new(base_url: Url, anon_key: SecretString, service_id: impl Into<String>) -> Self {
        Self {
            base_url,
            anon_key,
            service_id: service_id.into(),
            page_size: REVIEW_PAGE_SIZE,
            timeout: Duration::from_secs(30),
        }
    }
}
