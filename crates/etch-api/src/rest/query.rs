// ── Filter-builder query over a REST table ──
//
// Mirrors the `select / eq / is / order / range` builder of the data
// store's client libraries and renders it as PostgREST query parameters.

use std::fmt::Display;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::client::RestClient;
use crate::error::Error;
use crate::transport;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Filter {
    Eq(String, String),
    IsNull(String),
    NotNull(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Order {
    column: String,
    ascending: bool,
}

/// A lazily built query against one table.
///
/// Nothing is sent until [`fetch`](Self::fetch).
#[derive(Debug, Clone)]
#[must_use = "queries do nothing until fetched"]
pub struct Query<'a> {
    client: &'a RestClient,
    table: String,
    select: Option<String>,
    filters: Vec<Filter>,
    order: Vec<Order>,
    range: Option<(u64, u64)>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(client: &'a RestClient, table: &str) -> Self {
        Self {
            client,
            table: table.to_owned(),
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            range: None,
        }
    }

    /// Columns (and embedded relations) to return. Defaults to `*`.
    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_owned());
        self
    }

    /// `column = value`
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters
            .push(Filter::Eq(column.to_owned(), value.to_string()));
        self
    }

    /// `column IS NULL`
    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::IsNull(column.to_owned()));
        self
    }

    /// `column IS NOT NULL`
    pub fn not_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::NotNull(column.to_owned()));
        self
    }

    /// Append an ordering term. Earlier calls take precedence.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.to_owned(),
            ascending,
        });
        self
    }

    /// Restrict to rows `from..=to` (zero-based, inclusive).
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.range = Some((from, to.max(from)));
        self
    }

    /// The fully rendered request URL.
    pub fn to_url(&self) -> Result<Url, Error> {
        let mut url = self.client.table_url(&self.table)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", self.select.as_deref().unwrap_or("*"));

            for filter in &self.filters {
                match filter {
                    Filter::Eq(column, value) => pairs.append_pair(column, &format!("eq.{value}")),
                    Filter::IsNull(column) => pairs.append_pair(column, "is.null"),
                    Filter::NotNull(column) => pairs.append_pair(column, "not.is.null"),
                };
            }

            if !self.order.is_empty() {
                let terms: Vec<String> = self
                    .order
                    .iter()
                    .map(|o| {
                        let dir = if o.ascending { "asc" } else { "desc" };
                        format!("{}.{dir}", o.column)
                    })
                    .collect();
                pairs.append_pair("order", &terms.join(","));
            }

            if let Some((from, to)) = self.range {
                pairs.append_pair("offset", &from.to_string());
                pairs.append_pair("limit", &(to - from + 1).to_string());
            }
        }
        Ok(url)
    }

    /// Send the query and deserialize the returned rows.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, Error> {
        let url = self.to_url()?;
        debug!(table = %self.table, "GET {}", url);

        let timeout = self.client.timeout();
        let resp = self
            .client
            .http()
            .get(url)
            .send()
            .await
            .map_err(|e| transport::send_error(e, timeout))?;
        let resp = transport::error_for_status(resp).await?;
        transport::read_json(resp, timeout).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn client() -> RestClient {
        RestClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://db.example.com/").unwrap(),
        )
    }

    fn query_of(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn renders_filters_order_and_range() {
        let client = client();
        let url = client
            .table("service_reviews")
            .select("*")
            .eq("service_id", "svc-1")
            .eq("rating", 5)
            .not_null("response")
            .order("created_at", false)
            .range(10, 19)
            .to_url()
            .unwrap();

        assert_eq!(url.path(), "/rest/v1/service_reviews");
        assert_eq!(
            query_of(&url),
            vec![
                ("select".into(), "*".into()),
                ("service_id".into(), "eq.svc-1".into()),
                ("rating".into(), "eq.5".into()),
                ("response".into(), "not.is.null".into()),
                ("order".into(), "created_at.desc".into()),
                ("offset".into(), "10".into()),
                ("limit".into(), "10".into()),
            ]
        );
    }

    #[test]
    fn defaults_to_select_all_without_paging() {
        let client = client();
        let url = client.table("service_reviews").is_null("response").to_url().unwrap();
        assert_eq!(
            query_of(&url),
            vec![
                ("select".into(), "*".into()),
                ("response".into(), "is.null".into()),
            ]
        );
    }

    #[test]
    fn multiple_order_terms_join_in_call_order() {
        let client = client();
        let url = client
            .table("t")
            .order("rating", true)
            .order("created_at", false)
            .to_url()
            .unwrap();
        assert!(query_of(&url).contains(&("order".into(), "rating.asc,created_at.desc".into())));
    }
}
