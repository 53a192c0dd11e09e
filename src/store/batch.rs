use super::TableStore;
use crate::error::{StoreError, StoreResult};
use crate::storage::record::EntityRecord;

impl TableStore {
    /// Start a batch. Only one batch may be in flight: non-empty undo logs
    /// mean a previous batch never ended.
    pub fn begin_batch_transaction(&self, batch_id: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let pre_images = self.rollback_pre_images.read().unwrap();
        let inserted = self.inserted_during_batch.read().unwrap();
        if !pre_images.is_empty() || !inserted.is_empty() {
            return Err(StoreError::TransactionOverlap(batch_id.to_string()));
        }
        tracing::debug!("Batch transaction '{}' started", batch_id);
        Ok(())
    }

    /// End a batch. On success the undo logs are simply discarded; on
    /// failure every pre-image is restored and every batch insert removed.
    /// Both logs are cleared unconditionally.
    pub fn end_batch_transaction(
        &self,
        account: &str,
        table: &str,
        batch_id: &str,
        succeeded: bool,
    ) -> StoreResult<()> {
        self.ensure_open()?;
        let result = if succeeded {
            tracing::debug!("Batch transaction '{}' committed", batch_id);
            Ok(())
        } else {
            self.rollback_batch(account, table, batch_id)
        };

        self.rollback_pre_images.write().unwrap().clear();
        self.inserted_during_batch.write().unwrap().clear();
        result
    }

    fn rollback_batch(&self, account: &str, table: &str, batch_id: &str) -> StoreResult<()> {
        let collection = self
            .engine()
            .get_collection(&Self::entity_collection_name(account, table))
            .ok_or_else(|| StoreError::TableNotExist(table.to_string()))?;

        let pre_images: Vec<EntityRecord> = self.rollback_pre_images.read().unwrap().clone();
        for entity in &pre_images {
            let key = Self::entity_record_key(&entity.partition_key, &entity.row_key);
            // Drop whatever the batch left behind before restoring the copy.
            collection.delete(&key)?;
            collection.put(&key, entity)?;
        }

        let inserted: Vec<EntityRecord> = self.inserted_during_batch.read().unwrap().clone();
        for entity in &inserted {
            collection.delete(&Self::entity_record_key(
                &entity.partition_key,
                &entity.row_key,
            ))?;
        }

        tracing::info!(
            "Batch transaction '{}' rolled back: {} restored, {} removed",
            batch_id,
            pre_images.len(),
            inserted.len()
        );
        Ok(())
    }
}
