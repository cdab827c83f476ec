//! API error handling.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use pageview_core::error::ProxyError;

/// API error type.
///
/// Rendered as a plain-text body, matching what browser widgets expect from
/// the proxy on failure.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Status code this error renders with.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Message this error renders with.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<&ProxyError> for ApiError {
    fn from(err: &ProxyError) -> Self {
        match err {
            ProxyError::MissingParameter(_) => ApiError::bad_request(err.to_string()),
            ProxyError::UpstreamTransport(_) | ProxyError::RequestConstruction(_) => {
                tracing::error!(error = %err, "Upstream request failed");
                ApiError::internal(err.to_string())
            }
            ProxyError::UpstreamStatus(_) | ProxyError::UpstreamDecode(_) => {
                tracing::warn!(error = %err, "Upstream returned an unusable response");
                ApiError::internal(err.to_string())
            }
            ProxyError::Config(_) => {
                tracing::error!(error = %err, "Internal error");
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        ApiError::from(&err)
    }
}

/// Errors shared by every request that joined one upstream flight.
impl From<Arc<ProxyError>> for ApiError {
    fn from(err: Arc<ProxyError>) -> Self {
        ApiError::from(err.as_ref())
    }
}
