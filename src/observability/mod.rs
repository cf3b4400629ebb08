//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms)
//!     → tower_http TraceLayer (one span per request, tagged with x-request-id)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Structured fields, never interpolated strings, for ids and statuses
//! - Request ID flows from the inbound request to the upstream request
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
