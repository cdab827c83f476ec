//! DTOs for API requests and responses.

use serde::Serialize;
use url::form_urlencoded;

pub use pageview_core::types::PageviewsResponse;

/// Query string of `GET /pageviews`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PageviewsQuery {
    /// Page path to look up
    pub page: Option<String>,
}

impl PageviewsQuery {
    /// Parses a raw query string. When `page` repeats, the first value wins.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let page = raw.and_then(|raw| {
            form_urlencoded::parse(raw.as_bytes())
                .find(|(key, _)| key == "page")
                .map(|(_, value)| value.into_owned())
        });
        Self { page }
    }
}

/// Result of one upstream flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// Another flight had already cached the count
    Cached(u64),
    /// The count was fetched from upstream and cached
    Fetched(u64),
}

/// Response for the health check.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Entries currently held by the cache, expired ones included
    pub cache_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(None, None ; "no query string")]
    #[test_case(Some(""), None ; "empty query string")]
    #[test_case(Some("other=1"), None ; "page absent")]
    #[test_case(Some("page="), Some("") ; "page empty")]
    #[test_case(Some("page=%2Fblog%2F"), Some("/blog/") ; "percent decoded")]
    #[test_case(Some("page=/a&page=/b"), Some("/a") ; "first of repeated wins")]
    #[test_case(Some("x=1&page=/b"), Some("/b") ; "page after other keys")]
    fn test_from_raw(raw: Option<&str>, expected: Option<&str>) {
        let query = PageviewsQuery::from_raw(raw);
        assert_eq!(query.page.as_deref(), expected);
    }
}
