use rocksdb::DB;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, RwLock};

use crate::error::{StoreError, StoreResult};

/// Key prefix for records inside a collection's column family.
pub const DOC_PREFIX: &str = "doc:";

/// Handle to one named collection. Cheap to clone; all handles share the
/// engine's database instance.
#[derive(Clone)]
pub struct Collection {
    name: String,
    db: Arc<RwLock<DB>>,
}

impl Collection {
    pub(crate) fn new(name: String, db: Arc<RwLock<DB>>) -> Self {
        Self { name, db }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generate a record key: "doc:<key>"
    fn doc_key(key: &str) -> Vec<u8> {
        format!("{}{}", DOC_PREFIX, key).into_bytes()
    }

    /// Get a record by key
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let db = self.db.read().unwrap();
        let cf = db
            .cf_handle(&self.name)
            .expect("Column family should exist");

        let bytes = db
            .get_cf(cf, Self::doc_key(key))
            .map_err(|e| StoreError::InternalError(format!("Failed to get record: {}", e)))?;

        match bytes {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a record
    pub fn put<T: Serialize>(&self, key: &str, record: &T) -> StoreResult<()> {
        let bytes = serde_json::to_vec(record)?;

        let db = self.db.read().unwrap();
        let cf = db
            .cf_handle(&self.name)
            .expect("Column family should exist");

        db.put_cf(cf, Self::doc_key(key), &bytes)
            .map_err(|e| StoreError::InternalError(format!("Failed to put record: {}", e)))?;
        Ok(())
    }

    /// Remove a record by key
    pub fn delete(&self, key: &str) -> StoreResult<()> {
        let db = self.db.read().unwrap();
        let cf = db
            .cf_handle(&self.name)
            .expect("Column family should exist");

        db.delete_cf(cf, Self::doc_key(key))
            .map_err(|e| StoreError::InternalError(format!("Failed to delete record: {}", e)))?;
        Ok(())
    }

    /// All records in the collection, skipping any that fail to decode.
    pub fn scan<T: DeserializeOwned>(&self) -> Vec<T> {
        let db = self.db.read().unwrap();
        let cf = db
            .cf_handle(&self.name)
            .expect("Column family should exist");
        let prefix = DOC_PREFIX.as_bytes();

        db.prefix_iterator_cf(cf, prefix)
            .take_while(|r| r.as_ref().is_ok_and(|(k, _)| k.starts_with(prefix)))
            .filter_map(|result| {
                result
                    .ok()
                    .and_then(|(_, value)| serde_json::from_slice(&value).ok())
            })
            .collect()
    }

    /// Count records in the collection
    pub fn count(&self) -> usize {
        let db = self.db.read().unwrap();
        let cf = db
            .cf_handle(&self.name)
            .expect("Column family should exist");
        let prefix = DOC_PREFIX.as_bytes();

        db.prefix_iterator_cf(cf, prefix)
            .take_while(|r| r.as_ref().is_ok_and(|(k, _)| k.starts_with(prefix)))
            .count()
    }
}
