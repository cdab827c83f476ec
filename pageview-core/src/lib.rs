//! # Pageview Core
//!
//! Core types, errors, and traits shared by the pageview proxy crates.
//!
//! - **Types**: the normalized page key, the proxy response and the upstream body
//! - **Errors**: one error taxonomy for the whole request path
//! - **Constants**: upstream endpoint details and default timings
//! - **Traits**: the [`StatsSource`] seam between the handler and the upstream
//!
//! ## Example
//!
//! ```rust
//! use pageview_core::{PagePath, PageviewsResponse};
//!
//! let page = PagePath::parse(Some("/blog/post/")).unwrap();
//! assert_eq!(page.as_str(), "/blog/post");
//!
//! let json = serde_json::to_string(&PageviewsResponse::fresh(42, &page)).unwrap();
//! assert_eq!(json, r#"{"pageviews":42,"page":"/blog/post"}"#);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use constants::*;
pub use error::{ProxyError, Result};
pub use traits::*;
pub use types::*;
