//! Request-path errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;

use crate::cookies::CookieError;
use crate::observability::metrics;

/// Errors surfaced to a client while handling one request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// DNS, TCP, TLS, or protocol failure talking to the upstream.
    #[error("upstream request failed: {0}")]
    Upstream(#[source] reqwest::Error),

    /// No response headers from the upstream within the deadline.
    #[error("upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    /// The rewritten request could not be turned into an upstream URL.
    #[error("invalid upstream uri: {0}")]
    InvalidUpstreamUri(String),

    /// Inbound body exceeded the configured limit.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The inbound body could not be read, e.g. the client disconnected mid-upload.
    #[error("request body could not be read: {0}")]
    ClientBody(String),

    /// A create-session body that would produce a broken session.
    #[error("invalid session request: {0}")]
    InvalidSessionRequest(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Upstream(_) | ProxyError::InvalidUpstreamUri(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::ClientBody(_) | ProxyError::InvalidSessionRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ProxyError::Upstream(e) if e.is_connect() => "connect",
            ProxyError::Upstream(_) => "upstream",
            ProxyError::UpstreamTimeout(_) => "timeout",
            ProxyError::InvalidUpstreamUri(_) => "uri",
            ProxyError::BodyTooLarge { .. } => "body_too_large",
            ProxyError::ClientBody(_) => "client_body",
            ProxyError::InvalidSessionRequest(_) => "invalid_session_request",
        }
    }
}

impl From<CookieError> for ProxyError {
    fn from(err: CookieError) -> Self {
        ProxyError::InvalidSessionRequest(err.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Proxy error");
            metrics::record_upstream_error(self.kind());
        } else {
            tracing::warn!(error = %self, kind = self.kind(), "Rejected request");
        }

        let body = match &self {
            ProxyError::Upstream(_) | ProxyError::InvalidUpstreamUri(_) => {
                "Upstream request failed".to_string()
            }
            ProxyError::UpstreamTimeout(_) => "Upstream request timed out".to_string(),
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}
