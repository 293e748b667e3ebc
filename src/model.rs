//! Input-output models and the model registry

use crate::cache::ModelCache;
use crate::config::ServerConfig;
use crate::error::{MatrixError, Result};
use crate::matrix::{DqiGrid, Matrix};
use crate::metrics::CacheMetrics;
use crate::models::MatrixName;
use crate::store::MatrixStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// An input-output model backed by a folder of data files
#[derive(Serialize)]
pub struct Model {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip)]
    cache: ModelCache,
}

impl Model {
    /// Create a model whose data files live in `folder`
    pub fn new(
        id: impl Into<String>,
        folder: impl Into<PathBuf>,
        store: Arc<dyn MatrixStore>,
        metrics: Arc<CacheMetrics>,
    ) -> Self {
        let id = id.into();
        Model {
            name: id.clone(),
            id,
            description: None,
            cache: ModelCache::new(folder, store, metrics),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn folder(&self) -> &Path {
        self.cache.folder()
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// Numeric matrix with the given name (e.g. `A`)
    pub async fn matrix(&self, name: &str) -> Result<Arc<Matrix>> {
        self.cache.get_matrix(name).await
    }

    /// DQI grid with the given name (e.g. `B_dqi`)
    pub async fn dqi_matrix(&self, name: &str) -> Result<Arc<DqiGrid>> {
        self.cache.get_grid(name).await
    }

    /// Decode the given matrices and grids concurrently
    ///
    /// Every name is attempted; the first failure is returned after all
    /// loads have finished.
    pub async fn preload(self: &Arc<Self>, names: &[MatrixName]) -> Result<()> {
        let mut tasks = JoinSet::new();
        for &name in names {
            let model = Arc::clone(self);
            tasks.spawn(async move {
                match name {
                    MatrixName::Numeric(key) => model.cache.matrix(key).await.map(|_| ()),
                    MatrixName::Dqi(key) => model.cache.grid(key).await.map(|_| ()),
                }
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined
                .map_err(|e| MatrixError::InternalError(format!("preload task failed: {}", e)))
                .and_then(|r| r);
            if let Err(e) = result {
                warn!("Preload failed for model {}: {}", self.id, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// All models served by the process, keyed by id
#[derive(Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<Model>>,
}

impl ModelRegistry {
    /// Build a registry from already constructed models
    pub fn with_models(models: Vec<Model>) -> Self {
        ModelRegistry {
            models: models
                .into_iter()
                .map(|model| (model.id.clone(), Arc::new(model)))
                .collect(),
        }
    }

    /// Build the registry described by the configuration
    ///
    /// With an explicit model list each entry becomes a model. Otherwise
    /// every sub-directory of `data_dir` is a model named after the directory.
    pub fn from_config(
        config: &ServerConfig,
        store: Arc<dyn MatrixStore>,
        metrics: Arc<CacheMetrics>,
    ) -> Result<Self> {
        let data_dir = Path::new(&config.data_dir);

        let models = if config.models.is_empty() {
            discover_folders(data_dir)?
                .into_iter()
                .map(|(id, folder)| {
                    Model::new(id, folder, Arc::clone(&store), Arc::clone(&metrics))
                })
                .collect()
        } else {
            config
                .models
                .iter()
                .map(|cfg| {
                    Model::new(
                        cfg.id.clone(),
                        cfg.resolve_folder(data_dir),
                        Arc::clone(&store),
                        Arc::clone(&metrics),
                    )
                    .with_name(cfg.display_name())
                    .with_description(cfg.description.clone())
                })
                .collect()
        };

        let registry = Self::with_models(models);
        for model in registry.models() {
            info!("Registered model {} at {}", model.id, model.folder().display());
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Model>> {
        self.models.get(id).cloned()
    }

    /// Models in id order
    pub fn models(&self) -> impl Iterator<Item = &Arc<Model>> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Preload the given names for every model
    pub async fn preload(&self, names: &[MatrixName]) -> Result<()> {
        for model in self.models() {
            model.preload(names).await?;
        }
        Ok(())
    }
}

fn discover_folders(data_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(data_dir).map_err(|e| {
        MatrixError::ConfigError(format!(
            "Failed to read data_dir {}: {}",
            data_dir.display(),
            e
        ))
    })?;

    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(id) => folders.push((id, entry.path())),
            Err(name) => warn!("Skipping model folder with non UTF-8 name {:?}", name),
        }
    }
    folders.sort();
    Ok(folders)
}
