//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): dispatches by app, internal, outcome
//! - `dispatch_duration_seconds` (histogram): handler latency by app
//! - `dispatch_cache_total` (counter): output cache hit / miss / store
//! - `dispatch_hooks_total` (counter): hook handler runs by hook
//! - `http_requests_total` (counter): responses by method, status
//! - `http_request_duration_seconds` (histogram): time to response head
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   exporter every call is a no-op
//! - Outcome labels are static strings to keep cardinality bounded

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handler dispatch.
pub fn record_dispatch(app: &str, internal: bool, outcome: &'static str, started: Instant) {
    let internal = if internal { "true" } else { "false" };
    counter!(
        "dispatch_requests_total",
        "app" => app.to_string(),
        "internal" => internal,
        "outcome" => outcome
    )
    .increment(1);
    histogram!("dispatch_duration_seconds", "app" => app.to_string())
        .record(started.elapsed().as_secs_f64());
}

/// Record an output cache event (`hit`, `miss`, `store`).
pub fn record_cache(result: &'static str) {
    counter!("dispatch_cache_total", "result" => result).increment(1);
}

/// Record one handler run triggered by a hook.
pub fn record_hook(hook: &str) {
    counter!("dispatch_hooks_total", "hook" => hook.to_string()).increment(1);
}

/// Record one HTTP response.
pub fn record_http(method: &str, status: u16, started: Instant) {
    counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("http_request_duration_seconds").record(started.elapsed().as_secs_f64());
}
