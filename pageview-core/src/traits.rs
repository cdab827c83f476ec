//! Common traits for the pageview proxy.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::PagePath;

// ═══════════════════════════════════════════════════════════════════════════════
// STATS SOURCE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of pageview counts consulted on a cache miss.
///
/// Implementations might use:
/// - The Plausible aggregate API (production)
/// - A canned or counting fake (tests)
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Fetches the pageview count for a normalized page.
    ///
    /// Called at most once per request and never retried.
    async fn fetch_pageviews(&self, page: &PagePath) -> Result<u64>;
}
