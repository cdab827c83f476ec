//! Error types for the pageview proxy.
//!
//! Every failure on the request path is terminal for that request; nothing is
//! retried. The HTTP layer maps each variant to a status code.

use thiserror::Error;

/// Result type alias using `ProxyError`.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Main error type for proxy operations.
#[derive(Debug, Error)]
pub enum ProxyError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CLIENT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// A required query parameter was absent or empty.
    #[error("{0} query parameter is required")]
    MissingParameter(&'static str),

    // ═══════════════════════════════════════════════════════════════════════════
    // UPSTREAM ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// The upstream request could not be built.
    #[error("failed to build upstream request: {0}")]
    RequestConstruction(String),

    /// Connecting to or reading from upstream failed (includes timeouts).
    #[error("upstream request failed: {0}")]
    UpstreamTransport(String),

    /// Upstream answered with a status other than 200.
    #[error("unexpected status code from Plausible API: {0}")]
    UpstreamStatus(String),

    /// Upstream body did not match the expected shape.
    #[error("failed to decode Plausible API response: {0}")]
    UpstreamDecode(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STARTUP ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProxyError {
    /// Returns true if the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ProxyError::MissingParameter(_))
    }

    /// Returns true if the error came from talking to upstream.
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            ProxyError::RequestConstruction(_)
                | ProxyError::UpstreamTransport(_)
                | ProxyError::UpstreamStatus(_)
                | ProxyError::UpstreamDecode(_)
        )
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::UpstreamDecode(err.to_string())
    }
}
