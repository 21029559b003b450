//! OData-style provider client.
//!
//! Providers answer either with the standard `{"value": [...]}` envelope
//! or, for some legacy feeds, a bare JSON array. The query string is the
//! output of the filter builder: one `name=value` option (`$filter=...&` or
//! an `$apply=...` aggregation) whose value is percent-encoded, since
//! search terms may contain `&`, `#` or spaces.

use reqwest::Url;

use crate::retry::{RetryPolicy, send_json};
use crate::{DataResponse, SourceError, build_http_client};

/// Client for one provider base URL.
#[derive(Debug, Clone)]
pub struct ODataClient {
    client: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl ODataClient {
    /// Creates a client for `base_url` (e.g. `"https://data-service.example.org"`).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidUrl`] if `base_url` is not an absolute
    /// URL with a path, or [`SourceError::Http`] if the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        let invalid = |message: String| SourceError::InvalidUrl {
            url: base_url.to_string(),
            message,
        };
        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("URL cannot have a path".to_string()));
        }

        Ok(Self {
            client: build_http_client()?,
            base_url: parsed,
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Composes `{base_url}/{path}?{name}={value}` from filter builder
    /// output.
    ///
    /// `filter` is split at its first `=` into option name and value, a
    /// trailing `&` is dropped and the value is percent-encoded. An empty
    /// filter adds no query string.
    #[must_use]
    pub fn url(&self, path: &str, filter: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }

        let filter = filter.strip_suffix('&').unwrap_or(filter);
        if !filter.is_empty() {
            let (name, value) = filter.split_once('=').unwrap_or((filter, ""));
            url.query_pairs_mut().append_pair(name, value);
        }
        url
    }

    /// Fetches the rows at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails after retries or the
    /// body holds no row array.
    pub async fn fetch_rows(&self, url: &Url) -> Result<Vec<serde_json::Value>, SourceError> {
        log::debug!("GET {url}");
        let body = send_json(|| self.client.get(url.clone()), &self.retry).await?;
        let rows = extract_rows(body)?;
        log::debug!("GET {url}: {} rows", rows.len());
        Ok(rows)
    }

    /// Fetches the rows at `url`, turning any failure into an empty
    /// [`DataResponse`] carrying the error message.
    pub async fn fetch_or_empty(&self, url: &Url) -> DataResponse {
        let result = self.fetch_rows(url).await;
        if let Err(e) = &result {
            log::error!("Failed to fetch {url}: {e}");
        }
        DataResponse::from(result)
    }
}

/// Pulls the row array out of an OData response body.
///
/// # Errors
///
/// Returns [`SourceError::Response`] if the body is neither a bare array
/// nor an object with a `value` array.
pub fn extract_rows(body: serde_json::Value) -> Result<Vec<serde_json::Value>, SourceError> {
    match body {
        serde_json::Value::Array(rows) => Ok(rows),
        serde_json::Value::Object(mut object) => match object.remove("value") {
            Some(serde_json::Value::Array(rows)) => Ok(rows),
            _ => Err(SourceError::Response {
                message: "No value array in OData response".to_string(),
            }),
        },
        other => Err(SourceError::Response {
            message: format!("Expected a JSON object or array, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn query(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn composes_urls_from_filter_output() {
        let client = ODataClient::new("https://data.example.org/").unwrap();
        let url = client.url("/v3.4/Grants", "$filter=grantId eq 1&");
        assert_eq!(url.path(), "/v3.4/Grants");
        assert_eq!(
            query(&url),
            vec![("$filter".to_string(), "grantId eq 1".to_string())]
        );
        assert_eq!(
            client.url("v3.4/Grants", "").as_str(),
            "https://data.example.org/v3.4/Grants"
        );
    }

    #[test]
    fn keeps_base_path_prefix() {
        let client = ODataClient::new("https://example.org/odata/").unwrap();
        assert_eq!(client.url("Budgets", "").path(), "/odata/Budgets");
        let client = ODataClient::new("https://example.org/odata").unwrap();
        assert_eq!(client.url("/Budgets", "").path(), "/odata/Budgets");
    }

    #[test]
    fn encodes_reserved_characters_in_filter_values() {
        let client = ODataClient::new("https://data.example.org").unwrap();
        let url = client.url("v3.4/Grants", "$filter=contains(name,'R&D #1')&");
        assert_eq!(url.fragment(), None);
        assert_eq!(
            query(&url),
            vec![("$filter".to_string(), "contains(name,'R&D #1')".to_string())]
        );
    }

    #[test]
    fn nested_aggregation_is_a_single_option() {
        let client = ODataClient::new("https://data.example.org").unwrap();
        let url = client.url(
            "v3.4/Allocations",
            "$apply=filter(comp in ('HIV'))/groupby((loc),aggregate(amount with sum as value))",
        );
        assert_eq!(
            query(&url),
            vec![(
                "$apply".to_string(),
                "filter(comp in ('HIV'))/groupby((loc),aggregate(amount with sum as value))"
                    .to_string()
            )]
        );
    }

    #[test]
    fn rejects_invalid_base_urls() {
        assert!(matches!(
            ODataClient::new("not a url"),
            Err(SourceError::InvalidUrl { .. })
        ));
        assert!(matches!(
            ODataClient::new("mailto:data@example.org"),
            Err(SourceError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn extracts_value_envelope_and_bare_arrays() {
        let rows = extract_rows(json!({"@odata.context": "x", "value": [{"a": 1}]})).unwrap();
        assert_eq!(rows, vec![json!({"a": 1})]);
        let rows = extract_rows(json!([{"b": 2}, {"b": 3}])).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn rejects_bodies_without_rows() {
        assert!(matches!(
            extract_rows(json!({"error": "nope"})),
            Err(SourceError::Response { .. })
        ));
        assert!(matches!(
            extract_rows(json!("text")),
            Err(SourceError::Response { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_provider_yields_empty_data_with_message() {
        let client = ODataClient::new("http://127.0.0.1:9")
            .unwrap()
            .with_retry(RetryPolicy::NONE);
        let response = client.fetch_or_empty(&client.url("v3/Grants", "")).await;
        assert!(response.data.is_empty());
        assert!(response.message.is_some());
    }
}
