//! Per-model matrix cache
//!
//! Every model owns one [`ModelCache`] holding two memo tables: decoded
//! numeric matrices and decoded DQI grids. Entries are created on first
//! access and never evicted, since the data files do not change while the
//! process runs.
//!
//! Each key maps to its own slot. The table lock is only held to find or
//! create a slot, so reads of cached entries never wait on a load and loads
//! of different keys run in parallel. The first miss on an empty slot starts
//! a load on its own task; every caller that misses while it runs waits for
//! that load and receives its outcome, success or failure. A failed load
//! leaves the slot empty so the next caller starts a new one.

use crate::codec;
use crate::error::{MatrixError, Result};
use crate::matrix::{DqiGrid, Matrix};
use crate::metrics::CacheMetrics;
use crate::models::{DqiMatrix, NumericMatrix};
use crate::store::{FileStore, MatrixStore};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Published result of one load; `None` while the load runs
type Outcome<T> = Option<Result<Arc<T>>>;

enum SlotState<T> {
    Empty,
    Loading(watch::Receiver<Outcome<T>>),
    Ready(Arc<T>),
}

/// One cache entry
struct Slot<T> {
    state: Mutex<SlotState<T>>,
}

/// What a caller has to do after looking at a slot
enum Claim<T> {
    Ready(Arc<T>),
    Wait(watch::Receiver<Outcome<T>>),
    Lead(Flight<T>, watch::Receiver<Outcome<T>>),
}

impl<T> Slot<T> {
    fn new() -> Self {
        Slot {
            state: Mutex::new(SlotState::Empty),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self) -> Option<Arc<T>> {
        match &*self.lock() {
            SlotState::Ready(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Return the cached value, join the running load, or start a new one
    fn claim(self: &Arc<Self>) -> Claim<T> {
        let mut state = self.lock();
        match &*state {
            SlotState::Ready(value) => return Claim::Ready(Arc::clone(value)),
            SlotState::Loading(rx) => return Claim::Wait(rx.clone()),
            SlotState::Empty => {}
        }

        let (tx, rx) = watch::channel(None);
        *state = SlotState::Loading(rx.clone());
        let flight = Flight {
            slot: Arc::clone(self),
            tx,
            published: false,
        };
        Claim::Lead(flight, rx)
    }
}

/// Ownership of a running load
///
/// Dropped without publishing (the load task panicked), it resets the slot
/// so later callers can start over; current waiters see the channel close.
struct Flight<T> {
    slot: Arc<Slot<T>>,
    tx: watch::Sender<Outcome<T>>,
    published: bool,
}

impl<T> Flight<T> {
    fn publish(mut self, result: Result<Arc<T>>) {
        *self.slot.lock() = match &result {
            Ok(value) => SlotState::Ready(Arc::clone(value)),
            Err(_) => SlotState::Empty,
        };
        self.published = true;
        self.tx.send_replace(Some(result));
    }
}

impl<T> Drop for Flight<T> {
    fn drop(&mut self) {
        if !self.published {
            *self.slot.lock() = SlotState::Empty;
        }
    }
}

/// Wait for the load a receiver belongs to and take its outcome
async fn wait_for_load<T>(mut rx: watch::Receiver<Outcome<T>>) -> Result<Arc<T>> {
    let outcome = rx.wait_for(Option::is_some).await.map_err(|_| {
        MatrixError::InternalError("load task ended without a result".to_string())
    })?;
    match &*outcome {
        Some(result) => result.clone(),
        None => Err(MatrixError::InternalError(
            "load finished without a result".to_string(),
        )),
    }
}

/// Memo table with one lazily created slot per key
struct MemoTable<K, T> {
    slots: RwLock<HashMap<K, Arc<Slot<T>>>>,
}

impl<K: Copy + Eq + Hash, T> MemoTable<K, T> {
    fn new() -> Self {
        MemoTable {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Find or create the slot for `key`
    fn slot(&self, key: K) -> Arc<Slot<T>> {
        {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = slots.get(&key) {
                return Arc::clone(slot);
            }
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key).or_insert_with(|| Arc::new(Slot::new())))
    }

    fn peek(&self, key: K) -> Option<Arc<T>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(&key).and_then(|slot| slot.get())
    }

    fn loaded(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.get().is_some()).count()
    }
}

/// Number of decoded entries held by a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCacheStats {
    pub matrices: usize,
    pub grids: usize,
}

/// Reads and decodes the files of one model folder
///
/// Owned by the load tasks, so a load runs to completion even when the
/// caller that started it goes away.
#[derive(Clone)]
struct Loader {
    folder: PathBuf,
    store: Arc<dyn MatrixStore>,
    metrics: Arc<CacheMetrics>,
}

impl Loader {
    async fn load_matrix(self, key: NumericMatrix) -> Result<Arc<Matrix>> {
        let path = self.folder.join(key.file_name());
        let started = Instant::now();

        match self.read_and_decode(&path, codec::decode_matrix).await {
            Ok((matrix, bytes)) => {
                let elapsed = started.elapsed();
                self.metrics.record_matrix_load(bytes, elapsed);
                info!(
                    "Loaded matrix {} ({}x{}) from {} in {:?}",
                    key,
                    matrix.rows(),
                    matrix.cols(),
                    path.display(),
                    elapsed
                );
                Ok(Arc::new(matrix))
            }
            Err(e) => {
                self.metrics.record_load_failure();
                warn!("Failed to load matrix {} from {}: {}", key, path.display(), e);
                Err(e)
            }
        }
    }

    async fn load_grid(self, key: DqiMatrix) -> Result<Arc<DqiGrid>> {
        let path = self.folder.join(key.file_name());
        let started = Instant::now();

        match self.read_and_decode(&path, codec::decode_grid).await {
            Ok((grid, bytes)) => {
                let elapsed = started.elapsed();
                self.metrics.record_grid_load(bytes, elapsed);
                info!(
                    "Loaded grid {} ({} rows) from {} in {:?}",
                    key,
                    grid.row_count(),
                    path.display(),
                    elapsed
                );
                Ok(Arc::new(grid))
            }
            Err(e) => {
                self.metrics.record_load_failure();
                warn!("Failed to load grid {} from {}: {}", key, path.display(), e);
                Err(e)
            }
        }
    }

    /// Read a whole file and decode it on the blocking pool
    async fn read_and_decode<T, F>(&self, path: &Path, decode: F) -> Result<(T, u64)>
    where
        T: Send + 'static,
        F: FnOnce(&[u8]) -> Result<T> + Send + 'static,
    {
        let bytes = self.store.read(path).await?;
        let len = bytes.len() as u64;
        let value = tokio::task::spawn_blocking(move || decode(&bytes[..]))
            .await
            .map_err(|e| MatrixError::InternalError(format!("decode task failed: {}", e)))??;
        Ok((value, len))
    }
}

/// Cache of decoded matrices and grids for one model folder
pub struct ModelCache {
    loader: Loader,
    numeric: MemoTable<NumericMatrix, Matrix>,
    grids: MemoTable<DqiMatrix, DqiGrid>,
}

impl ModelCache {
    /// Create a new ModelCache
    ///
    /// # Arguments
    /// * `folder` - Folder holding the model's `*.bin` and `*.csv` files
    /// * `store` - Backend used to read file contents
    /// * `metrics` - Shared metrics collector
    pub fn new(
        folder: impl Into<PathBuf>,
        store: Arc<dyn MatrixStore>,
        metrics: Arc<CacheMetrics>,
    ) -> Self {
        ModelCache {
            loader: Loader {
                folder: folder.into(),
                store,
                metrics,
            },
            numeric: MemoTable::new(),
            grids: MemoTable::new(),
        }
    }

    /// Create a cache reading straight from the filesystem
    pub fn with_file_store(folder: impl Into<PathBuf>) -> Self {
        Self::new(folder, Arc::new(FileStore), Arc::new(CacheMetrics::new()))
    }

    pub fn folder(&self) -> &Path {
        &self.loader.folder
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.loader.metrics
    }

    /// Get a numeric matrix by name (e.g. `A`)
    ///
    /// # Returns
    /// * `Ok(Arc<Matrix>)` shared with every other caller of the same name
    /// * `Err(MatrixError::UnknownMatrix)` if the name is not a numeric
    ///   matrix; storage is not touched
    /// * a load error if reading or decoding fails
    pub async fn get_matrix(&self, name: &str) -> Result<Arc<Matrix>> {
        let key: NumericMatrix = name.parse()?;
        self.matrix(key).await
    }

    /// Get a DQI grid by name (e.g. `B_dqi`)
    pub async fn get_grid(&self, name: &str) -> Result<Arc<DqiGrid>> {
        let key: DqiMatrix = name.parse()?;
        self.grid(key).await
    }

    pub async fn matrix(&self, key: NumericMatrix) -> Result<Arc<Matrix>> {
        self.fetch(&self.numeric, key, move |loader| loader.load_matrix(key)).await
    }

    pub async fn grid(&self, key: DqiMatrix) -> Result<Arc<DqiGrid>> {
        self.fetch(&self.grids, key, move |loader| loader.load_grid(key)).await
    }

    /// Whether the named matrix or grid has already been decoded
    pub fn is_cached(&self, name: &str) -> bool {
        if let Ok(key) = name.parse::<NumericMatrix>() {
            return self.numeric.peek(key).is_some();
        }
        match name.parse::<DqiMatrix>() {
            Ok(key) => self.grids.peek(key).is_some(),
            Err(_) => false,
        }
    }

    pub fn get_stats(&self) -> ModelCacheStats {
        ModelCacheStats {
            matrices: self.numeric.loaded(),
            grids: self.grids.loaded(),
        }
    }

    /// Serve `key` from `table`, starting a load task on a miss when no
    /// load for the key is running
    async fn fetch<K, T, F, Fut>(
        &self,
        table: &MemoTable<K, T>,
        key: K,
        load: F,
    ) -> Result<Arc<T>>
    where
        K: Copy + Eq + Hash + fmt::Display,
        T: Send + Sync + 'static,
        F: FnOnce(Loader) -> Fut,
        Fut: Future<Output = Result<Arc<T>>> + Send + 'static,
    {
        let rx = match table.slot(key).claim() {
            Claim::Ready(value) => {
                debug!("Cache hit for {} in {}", key, self.folder().display());
                self.metrics().record_cache_hit();
                return Ok(value);
            }
            Claim::Wait(rx) => {
                debug!("Waiting for running load of {}", key);
                rx
            }
            Claim::Lead(flight, rx) => {
                let load = load(self.loader.clone());
                tokio::spawn(async move {
                    flight.publish(load.await);
                });
                rx
            }
        };

        self.metrics().record_cache_miss();
        wait_for_load(rx).await
    }
}
