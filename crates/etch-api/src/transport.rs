// Shared transport configuration for building reqwest::Client instances.
//
// Both the flag client and the REST client share timeout and user-agent
// settings through this module, along with the status-to-error mapping
// applied to every response.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::Error;

const USER_AGENT: &str = concat!("etch/", env!("CARGO_PKG_VERSION"));

/// Longest body excerpt carried in an error message.
const BODY_PREVIEW_LEN: usize = 200;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.into(),
        }
    }
}

impl TransportConfig {
    /// Config with the given request timeout and the default user agent.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Build a `reqwest::Client` with the given default headers.
    ///
    /// The flag client injects its client key here, the REST client its
    /// `apikey` / `Authorization` pair.
    pub fn build_client(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(Error::Transport)
    }
}

// ── Response helpers ─────────────────────────────────────────────────

/// Error body shape shared by the data store and the flag service.
///
/// Every field is optional; bodies that don't parse fall back to raw text.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Map a failed `send()` into the crate error, surfacing timeouts explicitly.
pub(crate) fn send_error(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            timeout_secs: timeout.as_secs(),
        }
    } else {
        Error::Transport(err)
    }
}

/// Turn a non-success response into the matching [`Error`] variant.
///
/// 401/403 map to [`Error::Unauthorized`]; callers that own a more specific
/// credential (the flag client) remap it.
pub(crate) async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::RateLimited {
            retry_after_secs: retry_after(resp.headers()),
        });
    }

    let text = resp.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .message
        .or(body.error)
        .unwrap_or_else(|| preview(&text).to_owned());

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized { message },
        s if s.is_server_error() => Error::Server {
            status: s.as_u16(),
            message,
        },
        s => Error::Api {
            message,
            code: body.code,
            status: s.as_u16(),
        },
    })
}

/// Read a JSON body, keeping a preview of the raw text on failure.
pub(crate) async fn read_json<T: DeserializeOwned>(
    resp: reqwest::Response,
    timeout: Duration,
) -> Result<T, Error> {
    let body = resp.text().await.map_err(|e| send_error(e, timeout))?;
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_crate_user_agent() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("etch/"));
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(BODY_PREVIEW_LEN + 10);
        assert_eq!(preview(&long).chars().count(), BODY_PREVIEW_LEN);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn retry_after_parses_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "7".parse().expect("header value"));
        assert_eq!(retry_after(&headers), Some(7));

        headers.insert(RETRY_AFTER, "Wed, 21 Oct 2015 07:28:00 GMT".parse().expect("header value"));
        assert_eq!(retry_after(&headers), None);
    }
}
