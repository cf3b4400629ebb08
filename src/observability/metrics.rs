//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): proxied requests by method, status
//! - `proxy_request_duration_seconds` (histogram): time to upstream response headers
//! - `proxy_upstream_errors_total` (counter): gateway failures by kind
//! - `proxy_sessions_created_total` (counter)
//! - `proxy_sessions_evicted_total` (counter): by reason (capacity, expired)
//! - `proxy_sessions_active` (gauge): sessions currently held

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("proxy_requests_total", "Proxied requests by method and status");
    describe_histogram!(
        "proxy_request_duration_seconds",
        "Time until upstream response headers arrived"
    );
    describe_counter!("proxy_upstream_errors_total", "Gateway failures by kind");
    describe_counter!("proxy_sessions_created_total", "Sessions created");
    describe_counter!("proxy_sessions_evicted_total", "Sessions removed by the eviction policy");
    describe_gauge!("proxy_sessions_active", "Sessions currently held");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(kind: &'static str) {
    counter!("proxy_upstream_errors_total", "kind" => kind).increment(1);
}

pub fn record_session_created() {
    counter!("proxy_sessions_created_total").increment(1);
}

pub fn record_sessions_evicted(reason: &'static str, count: usize) {
    counter!("proxy_sessions_evicted_total", "reason" => reason).increment(count as u64);
}

pub fn record_session_count(count: usize) {
    gauge!("proxy_sessions_active").set(count as f64);
}
