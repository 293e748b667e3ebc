//! Prometheus metrics for API requests

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

/// Metrics for matrix API requests
#[derive(Clone)]
pub struct RequestMetrics {
    /// Requests by kind (matrix, dqi, models, other) and HTTP status
    pub requests_total: Arc<CounterVec>,

    /// Request duration by kind
    pub request_duration_seconds: Arc<HistogramVec>,
}

impl RequestMetrics {
    /// Create metrics registered into `registry`
    pub fn with_registry(registry: &Registry) -> Result<Self, prometheus::Error> {
        let requests_total = CounterVec::new(
            Opts::new(
                "useeio_matrix_requests_total",
                "Total number of API requests by kind and status",
            ),
            &["kind", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "useeio_matrix_request_duration_seconds",
                "Duration of API requests in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["kind"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        Ok(Self {
            requests_total: Arc::new(requests_total),
            request_duration_seconds: Arc::new(request_duration_seconds),
        })
    }

    /// Record a finished request
    pub fn record_request(&self, kind: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        self.requests_total
            .with_label_values(&[kind, status.as_str()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[kind])
            .observe(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_request() {
        let registry = Registry::new();
        let metrics = RequestMetrics::with_registry(&registry).unwrap();

        metrics.record_request("matrix", 200, 0.002);
        metrics.record_request("matrix", 200, 0.004);
        metrics.record_request("dqi", 400, 0.001);

        assert_eq!(
            metrics
                .requests_total
                .with_label_values(&["matrix", "200"])
                .get(),
            2.0
        );
        assert_eq!(
            metrics
                .request_duration_seconds
                .with_label_values(&["matrix"])
                .get_sample_count(),
            2
        );

        let families = registry.gather();
        assert_eq!(families.len(), 2);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        RequestMetrics::with_registry(&registry).unwrap();
        assert!(RequestMetrics::with_registry(&registry).is_err());
    }
}
