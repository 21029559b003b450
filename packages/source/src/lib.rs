#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! OData provider client, response envelope and response cache.
//!
//! Analytics endpoints call external OData-style APIs with the filter built
//! by `data_explorer_filter`. [`odata::ODataClient`] performs those calls
//! with retry, [`DataResponse`] is the envelope handed back to the frontend
//! (fetch failures degrade to an empty result with a message), and
//! [`cache::ResponseCache`] memoizes responses per request signature.

pub mod cache;
pub mod odata;
pub mod retry;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-request timeout for provider calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors that can occur while talking to a provider.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A provider base URL could not be used.
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    /// The provider answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The response body did not have the expected shape.
    #[error("Unexpected response: {message}")]
    Response {
        /// Description of what went wrong.
        message: String,
    },
}

/// Rows returned to the frontend, with an error message when the provider
/// call failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    /// Result rows (empty on failure).
    pub data: Vec<serde_json::Value>,
    /// Error description, present only on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DataResponse {
    /// Successful response.
    #[must_use]
    pub const fn ok(data: Vec<serde_json::Value>) -> Self {
        Self {
            data,
            message: None,
        }
    }

    /// Failed response: no rows and the error message.
    #[must_use]
    pub fn failed(error: &SourceError) -> Self {
        Self {
            data: Vec::new(),
            message: Some(error.to_string()),
        }
    }
}

impl From<Result<Vec<serde_json::Value>, SourceError>> for DataResponse {
    fn from(result: Result<Vec<serde_json::Value>, SourceError>) -> Self {
        match result {
            Ok(rows) => Self::ok(rows),
            Err(e) => Self::failed(&e),
        }
    }
}

/// Builds the shared HTTP client used for provider calls.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the TLS backend cannot be initialized.
pub fn build_http_client() -> Result<reqwest::Client, SourceError> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("data-explorer/", env!("CARGO_PKG_VERSION")))
        .build()?)
}
