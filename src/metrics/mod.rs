//! In-memory metrics collection for the API.
//!
//! Metrics are exposed in Prometheus text format at `/metrics` and as JSON
//! at `/metrics/json`. The registry is a process-wide singleton; counters
//! and histograms are cheap atomics and safe to clone into middleware.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to export metrics: {0}")]
    ExportError(String),
}

#[derive(Debug, Clone)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

/// Histogram tracking only count and sum; enough for rate and mean latency.
#[derive(Debug, Clone)]
pub struct Histogram {
    sum_micros: Arc<AtomicU64>,
    count: Arc<AtomicU64>,
}

impl Histogram {
    pub fn new() -> Self {
        Self {
            sum_micros: Arc::new(AtomicU64::new(0)),
            count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn observe_seconds(&self, value: f64) {
        self.sum_micros
            .fetch_add((value * 1_000_000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn get_sum_seconds(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct MetricsRegistry {
    counters: DashMap<String, Counter>,
    histograms: DashMap<String, Histogram>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
            histograms: DashMap::new(),
        }
    }

    pub fn get_or_create_counter(&self, name: &str) -> Counter {
        self.counters
            .entry(name.to_string())
            .or_insert_with(Counter::new)
            .clone()
    }

    pub fn get_or_create_histogram(&self, name: &str) -> Histogram {
        self.histograms
            .entry(name.to_string())
            .or_insert_with(Histogram::new)
            .clone()
    }

    pub fn export_text(&self) -> String {
        let mut output = String::new();

        for entry in self.counters.iter() {
            let (name, counter) = entry.pair();
            output.push_str(&format!("# TYPE {} counter\n", name));
            output.push_str(&format!("{} {}\n", name, counter.get()));
        }

        for entry in self.histograms.iter() {
            let (name, histogram) = entry.pair();
            output.push_str(&format!("# TYPE {} histogram\n", name));
            output.push_str(&format!("{}_count {}\n", name, histogram.get_count()));
            output.push_str(&format!("{}_sum {}\n", name, histogram.get_sum_seconds()));
        }

        output
    }

    pub fn export_json(&self) -> serde_json::Value {
        let mut counters = serde_json::Map::new();
        for entry in self.counters.iter() {
            let (name, counter) = entry.pair();
            counters.insert(name.to_string(), json!(counter.get()));
        }

        let mut histograms = serde_json::Map::new();
        for entry in self.histograms.iter() {
            let (name, histogram) = entry.pair();
            histograms.insert(
                name.to_string(),
                json!({
                    "count": histogram.get_count(),
                    "sum_seconds": histogram.get_sum_seconds(),
                }),
            );
        }

        json!({
            "counters": counters,
            "histograms": histograms,
        })
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Global metrics registry
pub static METRICS: Lazy<MetricsRegistry> = Lazy::new(MetricsRegistry::new);

pub fn increment_counter(name: &str) {
    METRICS.get_or_create_counter(name).inc();
}

pub fn observe_histogram(name: &str, seconds: f64) {
    METRICS.get_or_create_histogram(name).observe_seconds(seconds);
}

/// Business counters for the transfer lifecycle
pub struct TransferMetrics {
    pub created: Counter,
    pub dispatched: Counter,
    pub received: Counter,
    pub cancelled: Counter,
    pub snapshot_refreshes: Counter,
    pub snapshot_superseded: Counter,
}

impl TransferMetrics {
    pub fn new() -> Self {
        Self {
            created: METRICS.get_or_create_counter("transfers_created_total"),
            dispatched: METRICS.get_or_create_counter("transfers_dispatched_total"),
            received: METRICS.get_or_create_counter("transfers_received_total"),
            cancelled: METRICS.get_or_create_counter("transfers_cancelled_total"),
            snapshot_refreshes: METRICS
                .get_or_create_counter("inventory_snapshot_refreshes_total"),
            snapshot_superseded: METRICS
                .get_or_create_counter("inventory_snapshot_superseded_total"),
        }
    }
}

impl Default for TransferMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Axum middleware recording request counts and latency.
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let response = next.run(request).await;

    increment_counter("http_requests_total");
    if response.status().is_server_error() {
        increment_counter("http_request_errors_total");
    } else if response.status().is_client_error() {
        increment_counter("http_request_rejections_total");
    }
    observe_histogram("http_request_duration_seconds", start.elapsed().as_secs_f64());

    response
}

pub async fn metrics_handler() -> Result<String, MetricsError> {
    Ok(METRICS.export_text())
}

pub async fn metrics_json_handler() -> Result<serde_json::Value, MetricsError> {
    Ok(METRICS.export_json())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let registry = MetricsRegistry::new();
        let counter = registry.get_or_create_counter("test_total");
        counter.inc();
        counter.inc_by(2);
        assert_eq!(registry.get_or_create_counter("test_total").get(), 3);
    }

    #[test]
    fn histogram_tracks_count_and_sum() {
        let registry = MetricsRegistry::new();
        let histogram = registry.get_or_create_histogram("test_duration_seconds");
        histogram.observe_seconds(0.25);
        histogram.observe_seconds(0.75);
        assert_eq!(histogram.get_count(), 2);
        assert!((histogram.get_sum_seconds() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn text_export_contains_type_lines() {
        let registry = MetricsRegistry::new();
        registry.get_or_create_counter("transfers_created_total").inc();
        let text = registry.export_text();
        assert!(text.contains("# TYPE transfers_created_total counter"));
        assert!(text.contains("transfers_created_total 1"));
    }
}
