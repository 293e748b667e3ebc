//! Metrics HTTP Endpoint
//!
//! Exposes cache counters and request metrics in Prometheus text format on a
//! separate port.

use crate::metrics::{CacheMetrics, MetricsSnapshot};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, Registry, TextEncoder};
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Metrics endpoint server
pub struct MetricsEndpoint {
    metrics: Arc<CacheMetrics>,
    registry: Registry,
    addr: SocketAddr,
}

impl MetricsEndpoint {
    /// Create a new metrics endpoint
    ///
    /// # Arguments
    /// * `metrics` - Shared cache metrics
    /// * `registry` - Prometheus registry holding the request metrics
    /// * `addr` - Address to bind the HTTP server to
    pub fn new(metrics: Arc<CacheMetrics>, registry: Registry, addr: SocketAddr) -> Self {
        Self {
            metrics,
            registry,
            addr,
        }
    }

    /// Start the metrics endpoint server
    ///
    /// Serves `/metrics` and `/health` until the process is terminated.
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("Metrics available at http://{}/metrics", self.addr);

        let state = Arc::new((self.metrics, self.registry));
        loop {
            let (stream, _) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let state = Arc::clone(&state);

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { handle_request(req, &state.0, &state.1).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving metrics connection: {:?}", err);
                }
            });
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    metrics: &CacheMetrics,
    registry: &Registry,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let response = match req.uri().path() {
        "/metrics" => metrics_response(metrics, registry),
        "/health" => text_response(StatusCode::OK, "application/json", r#"{"status":"healthy"}"#),
        _ => text_response(StatusCode::NOT_FOUND, "text/plain", "404 Not Found"),
    };
    Ok(response)
}

fn metrics_response(metrics: &CacheMetrics, registry: &Registry) -> Response<Full<Bytes>> {
    let mut body = format_prometheus_metrics(&metrics.get_stats());

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    match encoder.encode(&registry.gather(), &mut buffer) {
        Ok(()) => body.push_str(&String::from_utf8_lossy(&buffer)),
        Err(e) => warn!("Failed to encode request metrics: {}", e),
    }

    text_response(StatusCode::OK, "text/plain; version=0.0.4; charset=utf-8", body)
}

fn text_response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static(content_type),
    );
    response
}

fn push_metric(
    out: &mut String,
    name: &str,
    kind: &str,
    help: &str,
    value: impl std::fmt::Display,
) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
    let _ = writeln!(out, "{} {}", name, value);
    out.push('\n');
}

/// Format cache metrics in Prometheus exposition format
fn format_prometheus_metrics(snapshot: &MetricsSnapshot) -> String {
    let mut output = String::new();

    push_metric(
        &mut output,
        "useeio_matrix_cache_requests_total",
        "counter",
        "Total number of matrix requests handled",
        snapshot.requests,
    );
    push_metric(
        &mut output,
        "useeio_matrix_client_errors_total",
        "counter",
        "Requests rejected with a 4xx status",
        snapshot.client_errors,
    );
    push_metric(
        &mut output,
        "useeio_matrix_server_errors_total",
        "counter",
        "Requests failed with a 5xx status",
        snapshot.server_errors,
    );

    push_metric(
        &mut output,
        "useeio_matrix_cache_hits_total",
        "counter",
        "Number of cache hits",
        snapshot.cache_hits,
    );
    push_metric(
        &mut output,
        "useeio_matrix_cache_misses_total",
        "counter",
        "Number of cache misses",
        snapshot.cache_misses,
    );
    push_metric(
        &mut output,
        "useeio_matrix_cache_hit_rate",
        "gauge",
        "Cache hit rate percentage",
        format!("{:.2}", snapshot.cache_hit_rate()),
    );

    push_metric(
        &mut output,
        "useeio_matrix_matrix_loads_total",
        "counter",
        "Numeric matrices decoded from storage",
        snapshot.matrix_loads,
    );
    push_metric(
        &mut output,
        "useeio_matrix_grid_loads_total",
        "counter",
        "DQI grids decoded from storage",
        snapshot.grid_loads,
    );
    push_metric(
        &mut output,
        "useeio_matrix_load_failures_total",
        "counter",
        "Failed reads or decodes",
        snapshot.load_failures,
    );
    push_metric(
        &mut output,
        "useeio_matrix_bytes_loaded_total",
        "counter",
        "Total bytes read from data files",
        snapshot.bytes_loaded,
    );
    push_metric(
        &mut output,
        "useeio_matrix_load_duration_ms_avg",
        "gauge",
        "Average load duration in milliseconds",
        format!("{:.2}", snapshot.avg_load_duration_ms()),
    );

    output
}
