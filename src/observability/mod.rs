//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher, HTTP server, cache sweeper produce:
//!     → logging.rs (structured tracing events, request id in span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (human-readable or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the `x-request-id` header into the request span
//! - Metrics are cheap enough to record on every dispatch

pub mod logging;
pub mod metrics;
