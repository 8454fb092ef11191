// Data-store HTTP client
//
// Every request carries the anon key twice: as `apikey` for the gateway and
// as a bearer token for row-level security.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::query::Query;
use crate::error::Error;
use crate::transport::TransportConfig;

const API_KEY_HEADER: &str = "apikey";
const REST_PREFIX: &str = "rest/v1";

/// Client for the data store's REST surface.
///
/// Cheap to share by reference; build queries with [`table`](Self::table).
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl RestClient {
    /// Create a client authenticating with `anon_key`.
    pub fn new(
        base_url: Url,
        anon_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let invalid = |_| Error::Unauthorized {
            message: "anon key contains characters not allowed in a header".into(),
        };

        let mut headers = HeaderMap::new();
        let mut apikey = HeaderValue::from_str(anon_key.expose_secret()).map_err(invalid)?;
        apikey.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", anon_key.expose_secret()))
            .map_err(invalid)?;
        bearer.set_sensitive(true);
        headers.insert(API_KEY_HEADER, apikey);
        headers.insert(AUTHORIZATION, bearer);

        Ok(Self {
            http: transport.build_client(headers)?,
            base_url,
            timeout: transport.timeout,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// The caller is responsible for any auth headers.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout: TransportConfig::default().timeout,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Start a query against `name`.
    pub fn table(&self, name: &str) -> Query<'_> {
        Query::new(self, name)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn table_url(&self, table: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{REST_PREFIX}/{table}"))?)
    }
}
