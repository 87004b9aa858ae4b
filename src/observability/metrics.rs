//! Metrics collection and exposition.
//!
//! # Metrics
//! - `waypoint_requests_total` (counter): requests by method, route, status
//! - `waypoint_request_duration_seconds` (histogram): dispatch latency
//! - `waypoint_dispatch_failures_total` (counter): failures entering the
//!   error channel, by kind
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Unmatched requests are labelled `route="<unmatched>"` to bound
//!   cardinality

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "waypoint_requests_total";
pub const REQUEST_DURATION: &str = "waypoint_request_duration_seconds";
pub const DISPATCH_FAILURES: &str = "waypoint_dispatch_failures_total";

/// Route label for requests no route claimed.
pub const UNMATCHED: &str = "<unmatched>";

/// Start the Prometheus scrape endpoint on `addr` and install it as the
/// global recorder. Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &Method, route: &str, status: StatusCode, elapsed: Duration) {
    let method = method.as_str().to_string();
    let route = route.to_string();
    metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!(REQUEST_DURATION, "method" => method, "route" => route)
        .record(elapsed.as_secs_f64());
}

pub fn record_failure(kind: &'static str) {
    metrics::counter!(DISPATCH_FAILURES, "kind" => kind).increment(1);
}
