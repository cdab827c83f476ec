//! Plausible API client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};
use url::Url;

use pageview_core::constants::{AGGREGATE_PATH, STATS_METRIC, STATS_PERIOD, UPSTREAM_TIMEOUT};
use pageview_core::error::{ProxyError, Result};
use pageview_core::traits::StatsSource;
use pageview_core::types::{AggregateResponse, PagePath};

/// Upstream client configuration.
#[derive(Clone)]
pub struct UpstreamConfig {
    /// Base URL of the Plausible instance (e.g. "https://plausible.io")
    pub base_url: Url,
    /// Site identifier registered with Plausible
    pub site_id: String,
    /// API key sent as a bearer token
    pub api_key: String,
    /// Statistics period
    pub period: String,
    /// Request timeout
    pub timeout: Duration,
}

impl UpstreamConfig {
    /// Creates a config with the default period and timeout.
    pub fn new(base_url: Url, site_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            site_id: site_id.into(),
            api_key: api_key.into(),
            period: STATS_PERIOD.into(),
            timeout: UPSTREAM_TIMEOUT,
        }
    }

    /// Overrides the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url.as_str())
            .field("site_id", &self.site_id)
            .field("api_key", &"<redacted>")
            .field("period", &self.period)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Client for the aggregate statistics endpoint.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct PlausibleClient {
    config: UpstreamConfig,
    http_client: reqwest::Client,
}

impl PlausibleClient {
    /// Creates a new client.
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProxyError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Builds the full aggregate URL for a page.
    ///
    /// The aggregate path is appended to the base URL as-is, so a base with a
    /// path prefix keeps it.
    pub fn aggregate_url(&self, page: &PagePath) -> Result<Url> {
        let base = self.config.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{AGGREGATE_PATH}"))
            .map_err(|e| ProxyError::RequestConstruction(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("site_id", &self.config.site_id)
            .append_pair("period", &self.config.period)
            .append_pair("metrics", STATS_METRIC)
            .append_pair("filters", &page.upstream_filter());

        Ok(url)
    }

    /// Fetches the pageview count for a page. Never retries.
    #[instrument(skip(self, page), fields(page = %page))]
    pub async fn fetch(&self, page: &PagePath) -> Result<u64> {
        let url = self.aggregate_url(page)?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| ProxyError::UpstreamTransport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ProxyError::UpstreamStatus(status.to_string()));
        }

        let body: AggregateResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                ProxyError::UpstreamDecode(e.to_string())
            } else {
                ProxyError::UpstreamTransport(e.to_string())
            }
        })?;

        let pageviews = body.pageviews();
        debug!(pageviews, "Fetched pageviews from upstream");
        Ok(pageviews)
    }
}

#[async_trait]
impl StatsSource for PlausibleClient {
    async fn fetch_pageviews(&self, page: &PagePath) -> Result<u64> {
        self.fetch(page).await
    }
}
