use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::collection::Collection;
use crate::error::{StoreError, StoreResult};

/// Interval between background snapshots of pending writes.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(5);

/// Durable named collections backed by RocksDB, one column family per
/// collection. Records inside a collection are JSON blobs under `doc:` keys;
/// see [`Collection`].
pub struct StorageEngine {
    /// RocksDB instance wrapped in RwLock for mutability; collection handles
    /// and the autosave thread share it
    db: Arc<RwLock<DB>>,
    /// Database path for reopening
    path: PathBuf,
    /// Set once `close` has flushed; all further operations must fail
    closed: AtomicBool,
    autosave_stop: Arc<AtomicBool>,
    autosave_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StorageEngine {
    fn drop(&mut self) {
        // The autosave thread holds a database handle; stop it so dropping
        // the engine actually releases the store.
        self.autosave_stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.autosave_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("path", &self.path)
            .finish()
    }
}

impl StorageEngine {
    /// Open (or create) the backing database. A missing data directory on
    /// first open is not an error.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> StoreResult<Self> {
        let path = data_dir.as_ref().to_path_buf();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_keep_log_file_num(5);

        // Reopened stores must see the column families they created earlier.
        let cf_names = match DB::list_cf(&opts, &path) {
            Ok(cfs) => cfs,
            Err(_) => vec!["default".to_string()],
        };

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = cf_names
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &path, cf_descriptors)
            .map_err(|e| StoreError::InternalError(format!("Failed to open RocksDB: {}", e)))?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            path,
            closed: AtomicBool::new(false),
            autosave_stop: Arc::new(AtomicBool::new(false)),
            autosave_handle: Mutex::new(None),
        })
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &str {
        self.path.to_str().unwrap_or("./data")
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // ==================== Collection Operations ====================

    /// Create a new collection (column family)
    pub fn create_collection(&self, name: &str) -> StoreResult<Collection> {
        let mut db = self.db.write().unwrap();

        if db.cf_handle(name).is_some() {
            return Err(StoreError::InternalError(format!(
                "Collection '{}' already exists",
                name
            )));
        }

        let opts = Options::default();
        db.create_cf(name, &opts)
            .map_err(|e| StoreError::InternalError(format!("Failed to create collection: {}", e)))?;
        drop(db);

        Ok(Collection::new(name.to_string(), self.db.clone()))
    }

    /// Get a collection handle, or `None` if no such collection exists.
    pub fn get_collection(&self, name: &str) -> Option<Collection> {
        let db = self.db.read().unwrap();
        if db.cf_handle(name).is_none() {
            return None;
        }
        drop(db);

        Some(Collection::new(name.to_string(), self.db.clone()))
    }

    /// Drop a collection. Returns whether anything was dropped.
    pub fn delete_collection(&self, name: &str) -> StoreResult<bool> {
        let mut db = self.db.write().unwrap();

        if db.cf_handle(name).is_none() {
            return Ok(false);
        }

        db.drop_cf(name)
            .map_err(|e| StoreError::InternalError(format!("Failed to delete collection: {}", e)))?;

        Ok(true)
    }

    /// List all collection names
    pub fn list_collections(&self) -> Vec<String> {
        DB::list_cf(&Options::default(), &self.path)
            .unwrap_or_default()
            .into_iter()
            .filter(|name| name != "default")
            .collect()
    }

    // ==================== Persistence ====================

    /// Flush all pending writes to disk
    pub fn flush(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::StoreClosed);
        }
        let db = self.db.read().unwrap();
        db.flush()
            .map_err(|e| StoreError::InternalError(format!("Failed to flush: {}", e)))?;
        Ok(())
    }

    /// Start the background autosave thread. Idempotent.
    pub fn start_autosave(&self) {
        let mut guard = self.autosave_handle.lock().unwrap();
        if guard.is_some() {
            return;
        }

        let db = self.db.clone();
        let stop = self.autosave_stop.clone();
        *guard = Some(std::thread::spawn(move || {
            let mut last_flush = Instant::now();
            while !stop.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(200));
                if last_flush.elapsed() < AUTOSAVE_INTERVAL {
                    continue;
                }
                if let Err(e) = db.read().unwrap().flush() {
                    tracing::warn!("Autosave flush failed: {}", e);
                }
                last_flush = Instant::now();
            }
        }));
    }

    /// Flush and mark the engine closed; subsequent operations fail with
    /// [`StoreError::StoreClosed`]. Idempotent.
    pub fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.autosave_stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.autosave_handle.lock().unwrap().take() {
            let _ = handle.join();
        }

        let db = self.db.read().unwrap();
        db.flush()
            .map_err(|e| StoreError::InternalError(format!("Failed to flush on close: {}", e)))?;

        tracing::info!("Storage engine closed at {}", self.data_dir());
        Ok(())
    }
}
