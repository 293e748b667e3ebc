//! Storage backends for model data files

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use tracing::debug;

/// Source of raw matrix and grid file contents
///
/// Implementations read a whole file in one call; the cache decodes the
/// returned bytes.
#[async_trait]
pub trait MatrixStore: Send + Sync {
    /// Read the complete contents of the file at `path`
    async fn read(&self, path: &Path) -> Result<Bytes>;
}

/// Reads data files from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

#[async_trait]
impl MatrixStore for FileStore {
    async fn read(&self, path: &Path) -> Result<Bytes> {
        let data = tokio::fs::read(path).await?;
        debug!("Read {} bytes from {}", data.len(), path.display());
        Ok(Bytes::from(data))
    }
}
