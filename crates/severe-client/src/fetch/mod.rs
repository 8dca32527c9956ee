// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP fetch layer.
//!
//! Every remote call in this crate goes through the [`Fetch`] trait, which
//! keeps the rest of the crate free of I/O and lets tests serve canned
//! bodies. [`HttpFetcher`] is the blocking `reqwest` implementation and
//! [`CachedFetcher`] adds a bounded time-to-live cache in front of any
//! fetcher.

mod cache;

pub use cache::{CachedFetcher, TtlCache};

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;
use thiserror::Error;

/// Default user agent. The NWS and SPC services ask every client to identify itself.
pub const DEFAULT_USER_AGENT: &str = "severe-dashboard/0.1 (https://github.com/ccustine/severe-dashboard)";

/// Query string parameters, in the order they are sent.
pub type Query<'a> = &'a [(&'a str, &'a str)];

/// Errors raised by a remote call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A 2xx response whose body is an ArcGIS `{"error": {...}}` document.
    #[error("{url} reported error {code}: {message}")]
    Service { url: String, code: i64, message: String },
}

impl UpstreamError {
    /// Whether the failure was the request timing out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }
}

/// Source of remote response bodies.
pub trait Fetch: Send + Sync {
    /// GET `url` with `query` and return the body text of a 2xx response.
    fn get_text(&self, url: &str, query: Query<'_>) -> Result<String, UpstreamError>;

    /// GET `url` with `query` and parse the body as JSON.
    ///
    /// A body carrying a top-level `error` object is an error even though
    /// the response was 2xx.
    fn get_json(&self, url: &str, query: Query<'_>) -> Result<Value, UpstreamError> {
        let body = self.get_text(url, query)?;
        parse_json_body(url, &body)
    }

    /// Check that `url` answers 2xx without keeping the body.
    fn head(&self, url: &str) -> Result<(), UpstreamError> {
        self.get_text(url, &[]).map(|_| ())
    }
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn get_text(&self, url: &str, query: Query<'_>) -> Result<String, UpstreamError> {
        (**self).get_text(url, query)
    }

    fn get_json(&self, url: &str, query: Query<'_>) -> Result<Value, UpstreamError> {
        (**self).get_json(url, query)
    }

    fn head(&self, url: &str) -> Result<(), UpstreamError> {
        (**self).head(url)
    }
}

impl<F: Fetch + ?Sized> Fetch for Arc<F> {
    fn get_text(&self, url: &str, query: Query<'_>) -> Result<String, UpstreamError> {
        (**self).get_text(url, query)
    }

    fn get_json(&self, url: &str, query: Query<'_>) -> Result<Value, UpstreamError> {
        (**self).get_json(url, query)
    }

    fn head(&self, url: &str) -> Result<(), UpstreamError> {
        (**self).head(url)
    }
}

/// Parse a response body as JSON, rejecting ArcGIS error documents.
pub fn parse_json_body(url: &str, body: &str) -> Result<Value, UpstreamError> {
    let doc: Value = serde_json::from_str(body).map_err(|source| UpstreamError::Json {
        url: url.to_string(),
        source,
    })?;
    match service_error(url, &doc) {
        Some(err) => Err(err),
        None => Ok(doc),
    }
}

/// The error carried by a `{"error": {"code": .., "message": ..}}` document, if any.
#[must_use]
pub fn service_error(url: &str, doc: &Value) -> Option<UpstreamError> {
    let error = doc.get("error")?.as_object()?;
    let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    Some(UpstreamError::Service {
        url: url.to_string(),
        code,
        message,
    })
}

/// Build the cache key for a request: the URL followed by its query string.
#[must_use]
pub fn request_key(url: &str, query: Query<'_>) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let params: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{url}?{}", params.join("&"))
}

/// Configuration for outbound HTTP.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent sent with every request.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How long a cached body stays valid.
    pub cache_ttl: Duration,
    /// Maximum number of cached bodies.
    pub cache_capacity: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(25),
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 128,
        }
    }
}

/// Blocking HTTP fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the configured user agent and timeout.
    pub fn new(config: &FetchConfig) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/geo+json, application/json, text/csv"),
        );

        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|source| UpstreamError::Transport {
                url: String::new(),
                source,
            })?;

        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn get_text(&self, url: &str, query: Query<'_>) -> Result<String, UpstreamError> {
        debug!("GET {}", request_key(url, query));

        let transport = |source| UpstreamError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).query(query).send().map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().map_err(transport)
    }

    fn head(&self, url: &str) -> Result<(), UpstreamError> {
        debug!("HEAD {}", url);

        let response = self.client.head(url).send().map_err(|source| UpstreamError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(UpstreamError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned-response fetcher shared by the tests of every module.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{request_key, Fetch, Query, UpstreamError};

    #[derive(Debug, Default)]
    pub struct FixtureFetcher {
        bodies: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl FixtureFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Serve `body` for any request to `url`, whatever its query string.
        pub fn with(mut self, url: &str, body: impl Into<String>) -> Self {
            self.bodies.insert(url.to_string(), body.into());
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetch for FixtureFetcher {
        fn get_text(&self, url: &str, query: Query<'_>) -> Result<String, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies
                .get(url)
                .or_else(|| self.bodies.get(&request_key(url, query)))
                .cloned()
                .ok_or_else(|| UpstreamError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FixtureFetcher;
    use super::*;

    #[test]
    fn test_request_key_keeps_param_order() {
        let key = request_key("https://x/query", &[("where", "1=1"), ("f", "geojson")]);
        assert_eq!(key, "https://x/query?where=1=1&f=geojson");
        assert_eq!(request_key("https://x", &[]), "https://x");
    }

    #[test]
    fn test_get_json_rejects_malformed_body() {
        let fetcher = FixtureFetcher::new().with("https://x", "{not json");
        let err = fetcher.get_json("https://x", &[]).unwrap_err();
        assert!(matches!(err, UpstreamError::Json { .. }));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_missing_fixture_is_status_error() {
        let fetcher = FixtureFetcher::new();
        let err = fetcher.get_text("https://nowhere", &[]).unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 404, .. }));
    }

    #[test]
    fn test_fetch_through_arc() {
        let fetcher = Arc::new(FixtureFetcher::new().with("https://x", "[1,2]"));
        let value = fetcher.get_json("https://x", &[]).unwrap();
        assert_eq!(value, serde_json::json!([1, 2]));
    }

    #[test]
    fn test_get_json_rejects_service_error_document() {
        let body = r#"{"error":{"code":500,"message":"Unable to complete operation.","details":[]}}"#;
        let fetcher = FixtureFetcher::new().with("https://x/1/query", body);
        let err = fetcher.get_json("https://x/1/query", &[]).unwrap_err();
        match err {
            UpstreamError::Service { url, code, message } => {
                assert_eq!(url, "https://x/1/query");
                assert_eq!(code, 500);
                assert_eq!(message, "Unable to complete operation.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_error_field_that_is_not_an_object_is_data() {
        let doc = serde_json::json!({"error": null, "layers": []});
        assert!(service_error("https://x", &doc).is_none());
        assert!(service_error("https://x", &serde_json::json!([1])).is_none());
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let fetcher = FixtureFetcher::new().with("https://img/latest.jpg", "jpeg");
        assert!(fetcher.head("https://img/latest.jpg").is_ok());
        assert!(matches!(
            fetcher.head("https://img/missing.jpg"),
            Err(UpstreamError::Status { status: 404, .. })
        ));
    }
}
