use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total HTTP requests served. Labels: route, method, status.
pub const REQUESTS_TOTAL: &str = "lendex_requests_total";

/// Histogram: request latency in seconds. Labels: route.
pub const REQUEST_DURATION_SECONDS: &str = "lendex_request_duration_seconds";

// ── Domain counters ─────────────────────────────────────────────

/// Counter: bookings created.
pub const BOOKINGS_CREATED_TOTAL: &str = "lendex_bookings_created_total";

/// Counter: owner decisions applied. Labels: decision (approved/rejected).
pub const BOOKING_DECISIONS_TOTAL: &str = "lendex_booking_decisions_total";

/// Counter: comments accepted.
pub const COMMENTS_TOTAL: &str = "lendex_comments_total";

/// Counter: item requests created.
pub const ITEM_REQUESTS_TOTAL: &str = "lendex_item_requests_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
