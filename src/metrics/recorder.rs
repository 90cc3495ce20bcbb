//! Metrics recording implementation using Prometheus.

use prometheus::{
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_histogram_with_registry, CounterVec, Encoder, Histogram, HistogramVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

/// Trait for recording client metrics.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Records the terminal outcome of one `execute` call.
    fn record_request(&self, outcome: &str);

    /// Records how long one `execute` call took, retries included.
    fn record_request_duration(&self, outcome: &str, duration_secs: f64);

    /// Records a refresh lifecycle step (`started`, `joined`, `success`, `failure`, `skipped`).
    fn record_refresh(&self, result: &str);

    /// Records the duration of one token exchange.
    fn record_refresh_duration(&self, duration_secs: f64);
}

/// Prometheus metrics collector.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    client_requests_total: CounterVec,
    client_request_duration_seconds: HistogramVec,

    token_refresh_total: CounterVec,
    token_refresh_duration_seconds: Histogram,
}

impl Metrics {
    /// Creates a new metrics instance with its own Prometheus registry.
    pub fn new() -> Result<Self, String> {
        let registry = Arc::new(Registry::new());
        let registration = |name: &str, e: prometheus::Error| {
            format!("Failed to register {}: {}", name, e)
        };

        let client_requests_total = register_counter_vec_with_registry!(
            Opts::new("client_requests_total", "Total number of outbound calls by outcome"),
            &["outcome"],
            registry.clone()
        )
        .map_err(|e| registration("client_requests_total", e))?;

        let client_request_duration_seconds = register_histogram_vec_with_registry!(
            "client_request_duration_seconds",
            "Outbound call duration in seconds, refresh and retry included",
            &["outcome"],
            vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            registry.clone()
        )
        .map_err(|e| registration("client_request_duration_seconds", e))?;

        let token_refresh_total = register_counter_vec_with_registry!(
            Opts::new("token_refresh_total", "Token refresh lifecycle events"),
            &["result"],
            registry.clone()
        )
        .map_err(|e| registration("token_refresh_total", e))?;

        let token_refresh_duration_seconds = register_histogram_with_registry!(
            "token_refresh_duration_seconds",
            "Token exchange duration in seconds",
            vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            registry.clone()
        )
        .map_err(|e| registration("token_refresh_duration_seconds", e))?;

        Ok(Metrics {
            registry,
            client_requests_total,
            client_request_duration_seconds,
            token_refresh_total,
            token_refresh_duration_seconds,
        })
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| format!("Failed to encode metrics: {}", e))?;
        String::from_utf8(buffer).map_err(|e| format!("Metrics encoding produced invalid UTF-8: {}", e))
    }

    /// Current value of `token_refresh_total{result}`.
    pub fn refresh_count(&self, result: &str) -> u64 {
        self.token_refresh_total.with_label_values(&[result]).get() as u64
    }

    /// Current value of `client_requests_total{outcome}`.
    pub fn request_count(&self, outcome: &str) -> u64 {
        self.client_requests_total.with_label_values(&[outcome]).get() as u64
    }
}

impl MetricsRecorder for Metrics {
    fn record_request(&self, outcome: &str) {
        self.client_requests_total
            .with_label_values(&[outcome])
            .inc();
    }

    fn record_request_duration(&self, outcome: &str, duration_secs: f64) {
        self.client_request_duration_seconds
            .with_label_values(&[outcome])
            .observe(duration_secs);
    }

    fn record_refresh(&self, result: &str) {
        self.token_refresh_total.with_label_values(&[result]).inc();
    }

    fn record_refresh_duration(&self, duration_secs: f64) {
        self.token_refresh_duration_seconds.observe(duration_secs);
    }
}
