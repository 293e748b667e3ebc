//! Metrics collection for the matrix cache
//!
//! Thread-safe counters using atomic operations. They track requests, cache
//! hits and misses, file loads and load latency.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector shared by all model caches
#[derive(Debug, Default)]
pub struct CacheMetrics {
    // Request statistics
    requests: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,

    // Cache statistics
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,

    // Load statistics
    matrix_loads: AtomicU64,
    grid_loads: AtomicU64,
    load_failures: AtomicU64,
    bytes_loaded: AtomicU64,
    total_load_duration_us: AtomicU64,
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub client_errors: u64,
    pub server_errors: u64,

    pub cache_hits: u64,
    pub cache_misses: u64,

    pub matrix_loads: u64,
    pub grid_loads: u64,
    pub load_failures: u64,
    pub bytes_loaded: u64,
    pub total_load_duration_us: u64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a handled request
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request rejected because of the client (4xx)
    pub fn record_client_error(&self) {
        self.client_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that failed on the server side (5xx)
    pub fn record_server_error(&self) {
        self.server_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful numeric matrix load
    ///
    /// # Arguments
    /// * `bytes` - Size of the file that was decoded
    /// * `duration` - Time spent reading and decoding
    pub fn record_matrix_load(&self, bytes: u64, duration: Duration) {
        self.matrix_loads.fetch_add(1, Ordering::Relaxed);
        self.record_load(bytes, duration);
    }

    /// Record a successful DQI grid load
    pub fn record_grid_load(&self, bytes: u64, duration: Duration) {
        self.grid_loads.fetch_add(1, Ordering::Relaxed);
        self.record_load(bytes, duration);
    }

    /// Record a failed read or decode
    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_load(&self, bytes: u64, duration: Duration) {
        self.bytes_loaded.fetch_add(bytes, Ordering::Relaxed);
        self.total_load_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    ///
    /// Fields are loaded independently, so a snapshot taken under load may
    /// not be perfectly consistent across fields.
    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            matrix_loads: self.matrix_loads.load(Ordering::Relaxed),
            grid_loads: self.grid_loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            bytes_loaded: self.bytes_loaded.load(Ordering::Relaxed),
            total_load_duration_us: self.total_load_duration_us.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.client_errors.store(0, Ordering::Relaxed);
        self.server_errors.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.matrix_loads.store(0, Ordering::Relaxed);
        self.grid_loads.store(0, Ordering::Relaxed);
        self.load_failures.store(0, Ordering::Relaxed);
        self.bytes_loaded.store(0, Ordering::Relaxed);
        self.total_load_duration_us.store(0, Ordering::Relaxed);
    }
}

impl MetricsSnapshot {
    /// Total number of decodes of either kind
    pub fn total_loads(&self) -> u64 {
        self.matrix_loads + self.grid_loads
    }

    /// Cache hit rate as a percentage (0.0 to 100.0)
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            (self.cache_hits as f64 / total as f64) * 100.0
        }
    }

    /// Average load duration in milliseconds
    pub fn avg_load_duration_ms(&self) -> f64 {
        let loads = self.total_loads();
        if loads == 0 {
            0.0
        } else {
            (self.total_load_duration_us as f64 / loads as f64) / 1000.0
        }
    }
}
