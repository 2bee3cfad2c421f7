//! Metrics and monitoring for Atlas
//!
//! ## Table of Contents
//! - **AtlasMetrics**: Central metrics registry
//! - Prometheus text export for the `/metrics` endpoint

use crate::error::{AtlasError, Result};
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
};

/// Core metrics for Atlas
pub struct AtlasMetrics {
    registry: Registry,

    // Allocation metrics
    /// Allocation requests by mode
    pub allocation_requests: CounterVec,
    /// Allocation failures by error kind
    pub allocation_failures: CounterVec,
    /// Allocation planning latency by mode
    pub allocation_latency: HistogramVec,
    /// Horizon days planned across all requests
    pub days_planned: Counter,

    // Forecast metrics
    /// Completed snapshot refreshes
    pub forecast_refreshes: Counter,
    /// (store, category) pairs in the current snapshot
    pub forecast_pairs: Gauge,
    /// Snapshot build duration
    pub refresh_duration: Histogram,

    // Network metrics
    /// HTTP requests by method, path and status
    pub requests_total: CounterVec,
}

impl AtlasMetrics {
    /// Create a new metrics instance
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        // Allocation metrics
        let allocation_requests = CounterVec::new(
            Opts::new("atlas_allocation_requests_total", "Total allocation requests"),
            &["mode"],
        )?;
        let allocation_failures = CounterVec::new(
            Opts::new("atlas_allocation_failures_total", "Total allocation failures"),
            &["kind"],
        )?;
        let allocation_latency = HistogramVec::new(
            HistogramOpts::new("atlas_allocation_latency_seconds", "Allocation planning latency")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["mode"],
        )?;
        let days_planned = Counter::new("atlas_days_planned_total", "Total horizon days planned")?;

        // Forecast metrics
        let forecast_refreshes =
            Counter::new("atlas_forecast_refreshes_total", "Total snapshot refreshes")?;
        let forecast_pairs = Gauge::new(
            "atlas_forecast_pairs",
            "Forecast pairs in the current snapshot",
        )?;
        let refresh_duration = Histogram::with_opts(
            HistogramOpts::new("atlas_refresh_duration_seconds", "Snapshot build duration")
                .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )?;

        // Network metrics
        let requests_total = CounterVec::new(
            Opts::new("atlas_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;

        // Register all metrics
        registry.register(Box::new(allocation_requests.clone()))?;
        registry.register(Box::new(allocation_failures.clone()))?;
        registry.register(Box::new(allocation_latency.clone()))?;
        registry.register(Box::new(days_planned.clone()))?;
        registry.register(Box::new(forecast_refreshes.clone()))?;
        registry.register(Box::new(forecast_pairs.clone()))?;
        registry.register(Box::new(refresh_duration.clone()))?;
        registry.register(Box::new(requests_total.clone()))?;

        Ok(Self {
            registry,
            allocation_requests,
            allocation_failures,
            allocation_latency,
            days_planned,
            forecast_refreshes,
            forecast_pairs,
            refresh_duration,
            requests_total,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a successful allocation plan
    pub fn record_allocation(&self, mode: &str, days: usize, latency_secs: f64) {
        self.allocation_requests.with_label_values(&[mode]).inc();
        self.allocation_latency
            .with_label_values(&[mode])
            .observe(latency_secs);
        self.days_planned.inc_by(days as f64);
    }

    /// Record a failed allocation plan
    pub fn record_allocation_failure(&self, kind: &str) {
        self.allocation_failures.with_label_values(&[kind]).inc();
    }

    /// Record a completed snapshot refresh
    pub fn record_refresh(&self, pairs: usize, duration_secs: f64) {
        self.forecast_refreshes.inc();
        self.forecast_pairs.set(pairs as f64);
        self.refresh_duration.observe(duration_secs);
    }

    /// Record an HTTP request
    pub fn record_http_request(&self, method: &str, path: &str, status: u16) {
        let status_str = status.to_string();
        self.requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
    }

    /// Gather all metrics as text
    pub fn gather_text(&self) -> Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| AtlasError::metrics(format!("Encode error: {}", e)))?;
        String::from_utf8(buffer).map_err(|e| AtlasError::metrics(format!("UTF8 error: {}", e)))
    }
}
