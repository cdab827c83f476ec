//! Client for the Plausible aggregate statistics API.
//!
//! Turns a normalized page into one authenticated `GET` against
//! `/api/v1/stats/aggregate` and decodes the pageview count.

mod client;

pub use client::{PlausibleClient, UpstreamConfig};
