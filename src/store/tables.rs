use serde_json::Value;

use super::TableStore;
use crate::error::{StoreError, StoreResult};
use crate::storage::record::TableRecord;

impl TableStore {
    /// Register a table and create its entity collection.
    pub fn create_table(&self, account: &str, table: &str) -> StoreResult<TableRecord> {
        self.ensure_open()?;
        let tables = self.tables_collection()?;
        let key = Self::table_record_key(account, table);

        if tables.get::<TableRecord>(&key)?.is_some() {
            return Err(StoreError::TableAlreadyExists(table.to_string()));
        }

        let record = TableRecord {
            account: account.to_string(),
            table: table.to_string(),
            table_acl: None,
        };
        tables.put(&key, &record)?;

        // A stale entity collection can survive an unclean shutdown between
        // registry removal and collection drop.
        let collection_name = Self::entity_collection_name(account, table);
        if self.engine().get_collection(&collection_name).is_some() {
            self.engine().delete_collection(&collection_name)?;
        }
        self.engine().create_collection(&collection_name)?;

        tracing::info!("Created table '{}' for account '{}'", table, account);
        Ok(record)
    }

    /// Remove a table from the registry and drop its entity collection.
    pub fn delete_table(&self, account: &str, table: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let tables = self.tables_collection()?;
        let key = Self::table_record_key(account, table);

        if tables.get::<TableRecord>(&key)?.is_none() {
            return Err(StoreError::ResourceNotFound(table.to_string()));
        }
        tables.delete(&key)?;
        self.engine()
            .delete_collection(&Self::entity_collection_name(account, table))?;

        tracing::info!("Deleted table '{}' for account '{}'", table, account);
        Ok(())
    }

    pub fn get_table(&self, account: &str, table: &str) -> StoreResult<TableRecord> {
        self.ensure_open()?;
        self.tables_collection()?
            .get::<TableRecord>(&Self::table_record_key(account, table))?
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    /// Store (or clear) the table's ACL. The ACL is opaque here; nothing in
    /// the store interprets it.
    pub fn set_table_acl(
        &self,
        account: &str,
        table: &str,
        acl: Option<Value>,
    ) -> StoreResult<TableRecord> {
        self.ensure_open()?;
        let tables = self.tables_collection()?;
        let key = Self::table_record_key(account, table);

        let mut record = tables
            .get::<TableRecord>(&key)?
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        record.table_acl = acl;
        tables.put(&key, &record)?;
        Ok(record)
    }

    pub fn get_table_access_policy(&self, _account: &str, _table: &str) -> StoreResult<Value> {
        Err(StoreError::NotImplemented(
            "getTableAccessPolicy".to_string(),
        ))
    }

    pub fn set_table_access_policy(
        &self,
        _account: &str,
        _table: &str,
        _policy: Value,
    ) -> StoreResult<()> {
        Err(StoreError::NotImplemented(
            "setTableAccessPolicy".to_string(),
        ))
    }
}
