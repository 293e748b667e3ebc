//! USEEIO matrix server
//!
//! Loads configuration, sets up logging, registers the models found in the
//! data folder and serves the matrix API.
//!
//! # Usage
//! ```bash
//! # Start with default config (useeio_matrix.yaml)
//! useeio-matrix
//!
//! # Start with custom config
//! useeio-matrix /path/to/config.yaml
//! ```

use anyhow::Context;
use prometheus::Registry;
use std::env;
use std::sync::Arc;
use tracing::{error, info};
use useeio_matrix::{
    CacheMetrics, FileStore, MatrixHandler, MatrixServer, MetricsEndpoint, ModelRegistry,
    RequestMetrics, ServerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Starting USEEIO matrix server");

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "useeio_matrix.yaml".to_string());
    info!("Loading configuration from: {}", config_path);

    let config = ServerConfig::from_file(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;
    info!("  - Data directory: {}", config.data_dir);
    info!("  - Listen address: {}", config.listen_address);
    info!("  - Preload: {:?}", config.preload);

    let metrics = Arc::new(CacheMetrics::new());
    let registry = Arc::new(ModelRegistry::from_config(
        &config,
        Arc::new(FileStore),
        Arc::clone(&metrics),
    )?);
    if registry.is_empty() {
        error!("No models found in {}", config.data_dir);
    }
    info!("Registered {} models", registry.len());

    let preload = config.preload_names()?;
    if !preload.is_empty() {
        info!("Preloading {} matrices per model", preload.len());
        registry.preload(&preload).await?;
    }

    let prometheus_registry = Registry::new();
    let request_metrics = RequestMetrics::with_registry(&prometheus_registry)
        .map_err(|e| anyhow::anyhow!("failed to register request metrics: {}", e))?;

    if let Some(addr) = config.metrics_addr()? {
        let endpoint = MetricsEndpoint::new(Arc::clone(&metrics), prometheus_registry, addr);
        tokio::spawn(async move {
            if let Err(e) = endpoint.start().await {
                error!("Metrics endpoint failed: {}", e);
            }
        });
    }

    let handler = Arc::new(
        MatrixHandler::new(Arc::clone(&registry), Arc::clone(&metrics))
            .with_request_metrics(request_metrics),
    );
    let server = MatrixServer::bind(config.listen_addr()?, handler).await?;
    server.run().await?;

    Ok(())
}
