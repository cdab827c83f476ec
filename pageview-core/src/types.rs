//! Domain types: the normalized page key and the JSON bodies on either side
//! of the proxy.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ProxyError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// PAGE PATH
// ═══════════════════════════════════════════════════════════════════════════════

/// A normalized page identifier.
///
/// Used both as the cache key and as the `page` field echoed to callers.
/// Any page other than `/` loses exactly one trailing slash.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PagePath(String);

impl PagePath {
    /// Validates and normalizes a raw `page` query value.
    ///
    /// Absent and empty values are rejected. The text is otherwise not
    /// checked against any whitelist.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw {
            Some(page) if !page.is_empty() => Ok(Self::normalize(page)),
            _ => Err(ProxyError::MissingParameter("page")),
        }
    }

    fn normalize(page: &str) -> Self {
        if page != "/" {
            if let Some(stripped) = page.strip_suffix('/') {
                return Self(stripped.to_string());
            }
        }
        Self(page.to_string())
    }

    /// Returns the normalized page as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the upstream `filters` value.
    ///
    /// Upstream stores page paths with a trailing slash, so one is always
    /// appended here even though the cache key has none. For `/` this yields
    /// `event:page==//`.
    pub fn upstream_filter(&self) -> String {
        format!("event:page=={}/", self.0)
    }
}

impl fmt::Display for PagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PagePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROXY RESPONSE
// ═══════════════════════════════════════════════════════════════════════════════

/// Body returned by `GET /pageviews`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageviewsResponse {
    /// Pageview count over the statistics period
    pub pageviews: u64,
    /// Normalized page
    pub page: String,
    /// Present and `true` only when served from cache
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

impl PageviewsResponse {
    /// Response for a count just fetched from upstream.
    pub fn fresh(pageviews: u64, page: &PagePath) -> Self {
        Self {
            pageviews,
            page: page.as_str().to_string(),
            cached: false,
        }
    }

    /// Response for a count served from cache.
    pub fn cached(pageviews: u64, page: &PagePath) -> Self {
        Self {
            pageviews,
            page: page.as_str().to_string(),
            cached: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// UPSTREAM RESPONSE
// ═══════════════════════════════════════════════════════════════════════════════

/// Body of the upstream aggregate endpoint: `{"results":{"pageviews":{"value":n}}}`.
#[derive(Clone, Debug, Deserialize)]
pub struct AggregateResponse {
    /// Metric results keyed by metric name
    pub results: AggregateResults,
}

/// The `results` object of an aggregate response.
#[derive(Clone, Debug, Deserialize)]
pub struct AggregateResults {
    /// The `pageviews` metric
    pub pageviews: MetricValue,
}

/// A single aggregate metric.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct MetricValue {
    /// Metric value
    pub value: u64,
}

impl AggregateResponse {
    /// Returns the pageview count.
    pub fn pageviews(&self) -> u64 {
        self.results.pageviews.value
    }
}
