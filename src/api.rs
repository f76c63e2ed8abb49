use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::config::{Config, PageSelector};
use crate::error::{HarvestError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

/// Fixed query parameters sent on every request; the page selector and the
/// continuation token add the rest.
const BASE_PARAMS: &[(&str, &str)] = &[
    ("action", "query"),
    ("format", "json"),
    ("prop", "revisions"),
    ("rvprop", "content"),
];

/// MediaWiki query API client for one configured endpoint.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    selector_params: Vec<(String, String)>,
}

/// One fetched response body plus the exact URL that produced it, kept for
/// archive provenance.
pub struct ApiResponse {
    pub body: Value,
    pub source_url: String,
}

enum RequestFailure {
    Retryable(String),
    Fatal(String),
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HarvestError::Transport(e.to_string()))?;

        let selector_params = match &config.page_selector {
            PageSelector::Pageid(id) => vec![("pageids".to_string(), id.to_string())],
            PageSelector::Category(name) => vec![
                ("generator".to_string(), "categorymembers".to_string()),
                ("gcmtitle".to_string(), format!("Category:{}", name)),
            ],
        };

        Ok(ApiClient {
            client,
            base_url: config.base_url.clone(),
            selector_params,
        })
    }

    /// Issue one query, with the continuation token merged in when present.
    /// Transient failures (network errors, 429, 5xx) are retried with
    /// exponential backoff before becoming fatal.
    pub async fn fetch(&self, extra: Option<&(String, String)>) -> Result<ApiResponse> {
        let url = self.build_url(extra)?;
        let mut attempt = 0;
        loop {
            match self.fetch_once(&url).await {
                Ok(body) => {
                    return Ok(ApiResponse {
                        body,
                        source_url: url.to_string(),
                    });
                }
                Err(RequestFailure::Retryable(msg)) if attempt < MAX_RETRIES => {
                    let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                    warn!(
                        "{} (attempt {}/{}), backing off {:.1}s",
                        msg,
                        attempt + 1,
                        MAX_RETRIES,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(RequestFailure::Retryable(msg) | RequestFailure::Fatal(msg)) => {
                    return Err(HarvestError::Transport(msg));
                }
            }
        }
    }

    async fn fetch_once(&self, url: &reqwest::Url) -> std::result::Result<Value, RequestFailure> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RequestFailure::Retryable(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(RequestFailure::Retryable(format!("{} returned {}", url, status)));
        }
        if !status.is_success() {
            return Err(RequestFailure::Fatal(format!("{} returned {}", url, status)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RequestFailure::Fatal(format!("invalid JSON from {}: {}", url, e)))
    }

    fn build_url(&self, extra: Option<&(String, String)>) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| HarvestError::Config(format!("baseUrl '{}': {}", self.base_url, e)))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in BASE_PARAMS {
                query.append_pair(key, value);
            }
            for (key, value) in &self.selector_params {
                query.append_pair(key, value);
            }
            if let Some((key, value)) = extra {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

/// The continuation marker: `query-continue` holds a single nested object
/// whose single key/value pair is echoed back on the next request. Absent
/// means the listing is complete.
pub fn continuation(response: &Value) -> Option<(String, String)> {
    let inner = response.get("query-continue")?.as_object()?.values().next()?;
    let (key, value) = inner.as_object()?.iter().next()?;
    let value = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some((key.clone(), value))
}
