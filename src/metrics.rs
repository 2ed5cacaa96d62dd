//! Prometheus metrics for fetch, store and betting activity.
//!
//! The library only emits through the `metrics` facade. The binary installs
//! a Prometheus recorder when `METRICS_TEXTFILE` is set and writes the
//! exposition to that file when a command finishes, for pickup by a
//! node-exporter textfile collector.

use std::path::Path;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Search pages fetched counter metric name.
pub const METRIC_PAGES_FETCHED: &str = "market_pages_fetched_total";
/// Search pages failed counter metric name.
pub const METRIC_PAGES_FAILED: &str = "market_pages_failed_total";
/// Markets kept after filtering counter metric name.
pub const METRIC_MARKETS_KEPT: &str = "markets_kept_total";
/// Records inserted counter metric name.
pub const METRIC_RECORDS_INSERTED: &str = "records_inserted_total";
/// Records updated counter metric name.
pub const METRIC_RECORDS_UPDATED: &str = "records_updated_total";
/// Bets placed counter metric name.
pub const METRIC_BETS_PLACED: &str = "bets_placed_total";
/// Bets failed counter metric name.
pub const METRIC_BETS_FAILED: &str = "bets_failed_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );

    describe_counter!(METRIC_PAGES_FETCHED, "Market search pages fetched");
    describe_counter!(METRIC_PAGES_FAILED, "Market search pages that failed");
    describe_counter!(
        METRIC_MARKETS_KEPT,
        "Markets that passed the liquidity, resolution and token filter"
    );
    describe_counter!(METRIC_RECORDS_INSERTED, "Documents inserted by reconciliation");
    describe_counter!(METRIC_RECORDS_UPDATED, "Documents replaced by reconciliation");
    describe_counter!(METRIC_BETS_PLACED, "Bets placed successfully");
    describe_counter!(METRIC_BETS_FAILED, "Bet requests that failed");

    debug!("Metrics initialized");
}

/// Install a Prometheus recorder and return its handle for rendering.
pub fn install_recorder() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Render the current metrics to `path`.
pub fn write_textfile(handle: &PrometheusHandle, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, handle.render())
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, endpoint: &'static str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint).record(latency_ms);
}

/// Increment pages fetched counter.
pub fn inc_pages_fetched() {
    counter!(METRIC_PAGES_FETCHED).increment(1);
}

/// Increment pages failed counter.
pub fn inc_pages_failed() {
    counter!(METRIC_PAGES_FAILED).increment(1);
}

/// Add to markets kept counter.
pub fn add_markets_kept(count: usize) {
    counter!(METRIC_MARKETS_KEPT).increment(count as u64);
}

/// Add to records inserted counter.
pub fn add_records_inserted(count: usize) {
    counter!(METRIC_RECORDS_INSERTED).increment(count as u64);
}

/// Add to records updated counter.
pub fn add_records_updated(count: usize) {
    counter!(METRIC_RECORDS_UPDATED).increment(count as u64);
}

/// Increment bets placed counter.
pub fn inc_bets_placed() {
    counter!(METRIC_BETS_PLACED).increment(1);
}

/// Increment bets failed counter.
pub fn inc_bets_failed() {
    counter!(METRIC_BETS_FAILED).increment(1);
}
