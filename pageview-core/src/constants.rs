//! Constants for the upstream API and default proxy timings.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// UPSTREAM API
// ═══════════════════════════════════════════════════════════════════════════════

/// Path of the aggregate statistics endpoint, relative to the upstream base URL.
pub const AGGREGATE_PATH: &str = "/api/v1/stats/aggregate";

/// Statistics period requested from upstream.
pub const STATS_PERIOD: &str = "6mo";

/// Metric requested from upstream.
pub const STATS_METRIC: &str = "pageviews";

/// Upper bound on a single upstream call.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// How long a fetched pageview count is served from cache.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);

/// How often expired cache entries are swept.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// ═══════════════════════════════════════════════════════════════════════════════
// SERVER
// ═══════════════════════════════════════════════════════════════════════════════

/// Listening port when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 7000;
