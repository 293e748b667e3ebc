//! USEEIO Matrix Service
//!
//! Serves slices of the precomputed matrices of economic input-output models:
//! a whole matrix, a single row or a single column.
//!
//! # Overview
//!
//! Every model is a folder of data files. Numeric matrices (`A`, `B`, `C`,
//! `D`, `L`, `U`) are stored in a small binary layout, data quality grids
//! (`B_dqi`, `D_dqi`, `U_dqi`) as comma separated text. Files are decoded on
//! first access and kept in memory for the life of the process.
//!
//! # Architecture
//!
//! - [`codec`]: decodes `*.bin` matrices and `*.csv` grids
//! - [`Matrix`] and [`DqiGrid`]: immutable in-memory values
//! - [`ModelCache`]: per-model memo tables; concurrent first requests for the
//!   same matrix share one decode
//! - [`select_matrix`] / [`select_grid`]: bounds-checked row and column
//!   selection
//! - [`MatrixHandler`] and [`MatrixServer`]: the HTTP API
//! - [`CacheMetrics`], [`RequestMetrics`] and [`MetricsEndpoint`]: monitoring
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use useeio_matrix::{ModelCache, SliceQuery, select_matrix};
//!
//! # async fn run() -> useeio_matrix::Result<()> {
//! let cache = ModelCache::with_file_store("data/USEEIOv2.0");
//! let a = cache.get_matrix("A").await?;
//! let column = select_matrix(&a, SliceQuery::col(2))?;
//! println!("{} values", column.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```yaml
//! data_dir: "data"
//! listen_address: "127.0.0.1:8080"
//! preload: [A, L]
//! metrics_endpoint:
//!   enabled: true
//!   address: "127.0.0.1:9090"
//! ```
//!
//! See [`ServerConfig`] for all options.

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod matrix;
pub mod metrics;
pub mod metrics_endpoint;
pub mod model;
pub mod models;
pub mod request_metrics;
pub mod server;
pub mod slice;
pub mod store;

// Re-export commonly used types
pub use cache::{ModelCache, ModelCacheStats};
pub use codec::{decode_grid, decode_matrix, encode_matrix};
pub use config::{MetricsEndpointConfig, ModelConfig, ServerConfig};
pub use error::{MatrixError, Result};
pub use handler::MatrixHandler;
pub use matrix::{DqiGrid, Matrix};
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use metrics_endpoint::MetricsEndpoint;
pub use model::{Model, ModelRegistry};
pub use models::{DqiMatrix, MatrixName, NumericMatrix, SliceQuery};
pub use request_metrics::RequestMetrics;
pub use server::MatrixServer;
pub use slice::{select_grid, select_matrix, GridSlice, MatrixSlice};
pub use store::{FileStore, MatrixStore};
