//! App state: cache, upstream source, in-flight gates, config.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use pageview_cache::{CacheConfig, TtlCache};
use pageview_core::constants::{DEFAULT_CACHE_TTL, DEFAULT_PORT, DEFAULT_SWEEP_INTERVAL};
use pageview_core::error::{ProxyError, Result};
use pageview_core::traits::StatsSource;
use pageview_core::types::PagePath;
use pageview_upstream::{PlausibleClient, UpstreamConfig};

use crate::coalesce::InFlight;
use crate::dto::Lookup;

/// Cache of pageview counts keyed by normalized page.
pub type PageviewCache = TtlCache<PagePath, u64>;

/// Proxy configuration, normally read from the environment.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Port to listen on
    pub port: u16,
    /// Upstream connection settings
    pub upstream: UpstreamConfig,
    /// Cache timings
    pub cache: CacheConfig,
}

impl ProxyConfig {
    /// Loads configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let required = |name: &str| {
            var(name).ok_or_else(|| ProxyError::Config(format!("{name} is not set")))
        };

        let api_key = required("PLAUSIBLE_API_KEY")?;
        let site_id = required("PLAUSIBLE_SITE_ID")?;
        let base_url = required("PLAUSIBLE_URL")?;
        let base_url = Url::parse(&base_url)
            .map_err(|e| ProxyError::Config(format!("PLAUSIBLE_URL is invalid: {e}")))?;

        let port = match var("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ProxyError::Config(format!("PORT is not a valid port: {raw}")))?,
            None => DEFAULT_PORT,
        };

        let seconds = |name: &str, default: Duration| -> Result<Duration> {
            match var(name) {
                Some(raw) => raw.parse().map(Duration::from_secs).map_err(|_| {
                    ProxyError::Config(format!("{name} must be a whole number of seconds: {raw}"))
                }),
                None => Ok(default),
            }
        };

        Ok(Self {
            port,
            upstream: UpstreamConfig::new(base_url, site_id, api_key),
            cache: CacheConfig {
                default_ttl: seconds("CACHE_TTL_SECS", DEFAULT_CACHE_TTL)?,
                sweep_interval: seconds("CACHE_SWEEP_SECS", DEFAULT_SWEEP_INTERVAL)?,
            },
        })
    }
}

/// Shared state handed to every request.
pub struct AppState {
    /// Short-lived pageview counts
    pub cache: Arc<PageviewCache>,
    /// Where misses are fetched from
    pub source: Arc<dyn StatsSource>,
    /// Fetches currently in progress
    pub inflight: InFlight<Lookup>,
}

impl AppState {
    /// Creates state around an existing cache and stats source.
    pub fn new(cache: Arc<PageviewCache>, source: Arc<dyn StatsSource>) -> Self {
        Self {
            cache,
            source,
            inflight: InFlight::new(),
        }
    }

    /// Creates state backed by the Plausible API.
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        let client = PlausibleClient::new(config.upstream.clone())?;
        let cache = Arc::new(PageviewCache::with_config(config.cache.clone()));
        Ok(Self::new(cache, Arc::new(client)))
    }
}
