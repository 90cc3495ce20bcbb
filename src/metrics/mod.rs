//! Metrics collection and exposition for Prometheus.
//!
//! Counts request outcomes and the token refresh lifecycle.

mod recorder;

pub use recorder::{Metrics, MetricsRecorder};
