use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::storage::record::{EntityRecord, TableRecord};
use crate::storage::{Collection, StorageEngine};

pub mod batch;
pub mod entities;
pub mod query;
pub mod services;
pub mod tables;

pub use query::QueryOptions;

/// Registry of all tables across accounts.
pub const TABLES_COLLECTION: &str = "$TABLES_COLLECTION$";
/// Per-account service configuration records.
pub const SERVICES_COLLECTION: &str = "$SERVICES_COLLECTION$";
/// Hard cap on the number of records one query page returns.
pub const QUERY_RESULT_MAX_NUM: usize = 1000;

/// The table metadata store: the table registry, one entity collection per
/// table, and per-account service properties, persisted through
/// [`StorageEngine`].
///
/// The store is single-writer; the undo logs carry at most one in-flight
/// batch and are empty whenever no batch is active.
pub struct TableStore {
    engine: StorageEngine,
    initialized: AtomicBool,
    /// Pre-images of entities updated, merged, or deleted during the
    /// in-flight batch; restored on rollback
    rollback_pre_images: RwLock<Vec<EntityRecord>>,
    /// Entities inserted during the in-flight batch; removed on rollback
    inserted_during_batch: RwLock<Vec<EntityRecord>>,
}

impl TableStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> StoreResult<Self> {
        Ok(Self {
            engine: StorageEngine::new(data_dir)?,
            initialized: AtomicBool::new(false),
            rollback_pre_images: RwLock::new(Vec::new()),
            inserted_during_batch: RwLock::new(Vec::new()),
        })
    }

    /// Ensure the system collections exist, snapshot once, and start the
    /// autosave thread.
    pub fn init(&self) -> StoreResult<()> {
        if self.engine.get_collection(TABLES_COLLECTION).is_none() {
            self.engine.create_collection(TABLES_COLLECTION)?;
        }
        if self.engine.get_collection(SERVICES_COLLECTION).is_none() {
            self.engine.create_collection(SERVICES_COLLECTION)?;
        }
        self.engine.flush()?;
        self.engine.start_autosave();
        self.initialized.store(true, Ordering::SeqCst);
        tracing::info!("Table store initialized at {}", self.engine.data_dir());
        Ok(())
    }

    /// Flush through the storage layer and mark the store closed.
    pub fn close(&self) -> StoreResult<()> {
        self.engine.close()?;
        tracing::info!("Table store closed");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.engine.is_closed()
    }

    pub(crate) fn ensure_open(&self) -> StoreResult<()> {
        if self.engine.is_closed() {
            return Err(StoreError::StoreClosed);
        }
        Ok(())
    }

    pub(crate) fn engine(&self) -> &StorageEngine {
        &self.engine
    }

    // ==================== Key Helpers ====================

    /// Name of the entity collection backing `(account, table)`.
    pub(crate) fn entity_collection_name(account: &str, table: &str) -> String {
        format!("{}${}", account, table)
    }

    /// Registry key of a table record.
    pub(crate) fn table_record_key(account: &str, table: &str) -> String {
        format!("{}${}", account, table)
    }

    /// Binary-safe primary key for an entity row; hex keeps arbitrary
    /// partition and row keys from colliding with the separator.
    pub(crate) fn entity_record_key(partition_key: &str, row_key: &str) -> String {
        format!("{}:{}", hex::encode(partition_key), hex::encode(row_key))
    }

    // ==================== Collection Accessors ====================

    pub(crate) fn tables_collection(&self) -> StoreResult<Collection> {
        self.engine
            .get_collection(TABLES_COLLECTION)
            .ok_or_else(|| StoreError::InternalError("tables collection missing".to_string()))
    }

    pub(crate) fn services_collection(&self) -> StoreResult<Collection> {
        self.engine
            .get_collection(SERVICES_COLLECTION)
            .ok_or_else(|| StoreError::InternalError("services collection missing".to_string()))
    }

    /// Registry-checked lookup of a table's entity collection, used by
    /// entity operations.
    pub(crate) fn entity_collection(&self, account: &str, table: &str) -> StoreResult<Collection> {
        let tables = self.tables_collection()?;
        let record: Option<TableRecord> = tables.get(&Self::table_record_key(account, table))?;
        if record.is_none() {
            return Err(StoreError::TableNotExist(table.to_string()));
        }
        self.engine
            .get_collection(&Self::entity_collection_name(account, table))
            .ok_or_else(|| StoreError::TableNotExist(table.to_string()))
    }
}
