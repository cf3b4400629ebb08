//! Proxy mediation stage.
//!
//! # Responsibilities
//! - Rewrite the inbound request into the upstream request
//! - Replace the cookie header with the resolved session's merged view
//! - Forward once and stream the upstream response back unmodified
//!
//! # Design Decisions
//! - One forwarding attempt per client request, no retries
//! - Upstream `Set-Cookie` headers are passed to the client, never stored
//! - Dropping the returned future or body aborts the upstream request
//! - Timeout covers the wait for response headers only; bodies may stream for longer

use axum::{
    body::Body,
    http::{header, request::Parts, HeaderMap, Method, Request},
    response::Response,
};
use http_body_util::LengthLimitError;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

use crate::config::{SecurityConfig, TimeoutConfig, UpstreamConfig};
use crate::error::ProxyError;
use crate::mediation::resolver::SessionContext;
use crate::mediation::rewrite::{strip_hop_by_hop, strip_mount, upstream_url};
use crate::observability::metrics;

/// Failure building the mediator at startup.
#[derive(Debug, Error)]
pub enum MediatorError {
    #[error("invalid upstream target: {0}")]
    Target(#[from] url::ParseError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The upstream request, before a body is attached.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

/// Replace the outbound cookie header for resolved sessions; leave anonymous requests alone.
pub fn inject_cookies(context: &SessionContext, headers: &mut HeaderMap) {
    let Some(cookies) = context.cookies() else {
        return;
    };

    headers.remove(header::COOKIE);
    match cookies.to_header_value() {
        Some(value) => {
            headers.insert(header::COOKIE, value);
        }
        None if !cookies.is_empty() => {
            tracing::warn!(
                session_id = ?context.session_id(),
                "Merged cookies not representable as a header, sending none"
            );
        }
        None => {}
    }
}

/// 413 only for the length limit; any other read failure is the client's body going bad.
fn body_error(err: axum::Error, limit: usize) -> ProxyError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return ProxyError::BodyTooLarge { limit };
        }
        source = e.source();
    }
    ProxyError::ClientBody(err.to_string())
}

/// Forwards proxied requests to the upstream search target.
#[derive(Debug, Clone)]
pub struct ProxyMediator {
    client: reqwest::Client,
    target: Url,
    mount_path: String,
    change_origin: bool,
    response_timeout: Duration,
    max_body_size: usize,
}

impl ProxyMediator {
    pub fn new(
        upstream: &UpstreamConfig,
        timeouts: &TimeoutConfig,
        security: &SecurityConfig,
    ) -> Result<Self, MediatorError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            target: Url::parse(&upstream.target)?,
            mount_path: upstream.mount_path.clone(),
            change_origin: upstream.change_origin,
            response_timeout: Duration::from_secs(timeouts.request_secs),
            max_body_size: security.max_body_size,
        })
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Build the upstream request line and headers from the inbound request.
    pub fn prepare(&self, context: &SessionContext, parts: &Parts) -> Result<OutboundRequest, ProxyError> {
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = upstream_url(&self.target, &strip_mount(path_and_query, &self.mount_path))?;

        let mut headers = parts.headers.clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::CONTENT_LENGTH);
        if self.change_origin {
            headers.remove(header::HOST);
        }
        inject_cookies(context, &mut headers);

        Ok(OutboundRequest {
            method: parts.method.clone(),
            url,
            headers,
        })
    }

    /// Forward `request` upstream and stream the response back.
    pub async fn forward(&self, context: &SessionContext, request: Request<Body>) -> Result<Response, ProxyError> {
        let start = Instant::now();
        let (parts, body) = request.into_parts();
        let outbound = self.prepare(context, &parts)?;

        let body = axum::body::to_bytes(body, self.max_body_size)
            .await
            .map_err(|e| body_error(e, self.max_body_size))?;

        tracing::debug!(
            method = %outbound.method,
            upstream = %outbound.url,
            session_id = ?context.session_id(),
            "Forwarding request"
        );

        let method = outbound.method.clone();
        let mut builder = self
            .client
            .request(outbound.method, outbound.url)
            .headers(outbound.headers);
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let upstream = match tokio::time::timeout(self.response_timeout, builder.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                metrics::record_request(method.as_str(), 502, start);
                return Err(ProxyError::Upstream(e));
            }
            Err(_) => {
                metrics::record_request(method.as_str(), 504, start);
                return Err(ProxyError::UpstreamTimeout(self.response_timeout));
            }
        };

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);
        metrics::record_request(method.as_str(), status.as_u16(), start);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
