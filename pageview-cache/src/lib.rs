//! TTL cache for pageview counts.
//!
//! Generic in-memory cache with a default expiry, per-entry overrides and a
//! periodic background sweep.

mod cache;
mod sweep;

pub use cache::{CacheConfig, CacheStats, Expiry, TtlCache};
pub use sweep::SweepHandle;
