use super::TableStore;
use crate::error::{StoreError, StoreResult};
use crate::storage::record::{EntityRecord, ODATA_TYPE_SUFFIX};

/// Replace the first two colons with their URL-encoded form. Some clients
/// send the etag URL-encoded while the stored form is raw; both sides are
/// encoded before comparing so either form matches.
fn urlencode_colons(etag: &str) -> String {
    etag.replacen(':', "%3A", 2)
}

/// Update/merge etag check: `None` and `"*"` bypass, anything else must
/// match after colon encoding of both sides.
fn check_etag(stored: &str, if_match: Option<&str>) -> StoreResult<()> {
    match if_match {
        None | Some("*") => Ok(()),
        Some(expected) => {
            if urlencode_colons(stored) == urlencode_colons(expected) {
                Ok(())
            } else {
                Err(StoreError::PreconditionFailed(format!(
                    "etag mismatch: stored {}, if-match {}",
                    stored, expected
                )))
            }
        }
    }
}

impl TableStore {
    /// Insert a new entity. A non-empty `batch_id` records the insert for
    /// delete-on-rollback.
    pub fn insert_table_entity(
        &self,
        account: &str,
        table: &str,
        entity: EntityRecord,
        batch_id: &str,
    ) -> StoreResult<EntityRecord> {
        self.ensure_open()?;
        let collection = self.entity_collection(account, table)?;
        let key = Self::entity_record_key(&entity.partition_key, &entity.row_key);

        if collection.get::<EntityRecord>(&key)?.is_some() {
            return Err(StoreError::EntityAlreadyExists(format!(
                "{}/{}",
                entity.partition_key, entity.row_key
            )));
        }

        let mut entity = entity;
        entity.touch_timestamp();
        collection.put(&key, &entity)?;

        if !batch_id.is_empty() {
            self.inserted_during_batch
                .write()
                .unwrap()
                .push(entity.clone());
        }
        Ok(entity)
    }

    /// Upsert: update when the entity exists, insert otherwise. With a
    /// concrete `if_match` the existence probe is skipped and the update
    /// path enforces the etag.
    pub fn insert_or_update_table_entity(
        &self,
        account: &str,
        table: &str,
        entity: EntityRecord,
        if_match: Option<&str>,
        batch_id: &str,
    ) -> StoreResult<EntityRecord> {
        self.ensure_open()?;
        match if_match {
            None | Some("*") => {
                let collection = self.entity_collection(account, table)?;
                let key = Self::entity_record_key(&entity.partition_key, &entity.row_key);
                if collection.get::<EntityRecord>(&key)?.is_some() {
                    self.update_table_entity(account, table, entity, if_match, batch_id)
                } else {
                    self.insert_table_entity(account, table, entity, batch_id)
                }
            }
            _ => self.update_table_entity(account, table, entity, if_match, batch_id),
        }
    }

    /// Upsert variant dispatching to merge. Existence is a function of the
    /// committed store, not the in-flight batch.
    pub fn insert_or_merge_table_entity(
        &self,
        account: &str,
        table: &str,
        entity: EntityRecord,
        if_match: Option<&str>,
        batch_id: &str,
    ) -> StoreResult<EntityRecord> {
        self.ensure_open()?;
        match if_match {
            None | Some("*") => {
                let collection = self.entity_collection(account, table)?;
                let key = Self::entity_record_key(&entity.partition_key, &entity.row_key);
                if collection.get::<EntityRecord>(&key)?.is_some() {
                    self.merge_table_entity(account, table, entity, if_match, batch_id)
                } else {
                    self.insert_table_entity(account, table, entity, batch_id)
                }
            }
            _ => self.merge_table_entity(account, table, entity, if_match, batch_id),
        }
    }

    /// Replace an existing entity wholesale.
    pub fn update_table_entity(
        &self,
        account: &str,
        table: &str,
        entity: EntityRecord,
        if_match: Option<&str>,
        batch_id: &str,
    ) -> StoreResult<EntityRecord> {
        self.ensure_open()?;
        let collection = self.entity_collection(account, table)?;
        let key = Self::entity_record_key(&entity.partition_key, &entity.row_key);

        let existing = collection
            .get::<EntityRecord>(&key)?
            .ok_or_else(|| {
                StoreError::EntityNotFound(format!(
                    "{}/{}",
                    entity.partition_key, entity.row_key
                ))
            })?;

        if !batch_id.is_empty() {
            self.rollback_pre_images.write().unwrap().push(existing.clone());
        }
        check_etag(&existing.etag, if_match)?;

        let mut entity = entity;
        entity.touch_timestamp();
        collection.put(&key, &entity)?;
        Ok(entity)
    }

    /// Overlay the incoming properties onto the stored entity. Type tags
    /// follow their base key: an incoming `<k>@odata.type` overwrites the
    /// stored tag, an absent one deletes it.
    pub fn merge_table_entity(
        &self,
        account: &str,
        table: &str,
        entity: EntityRecord,
        if_match: Option<&str>,
        batch_id: &str,
    ) -> StoreResult<EntityRecord> {
        self.ensure_open()?;
        let collection = self.entity_collection(account, table)?;
        let key = Self::entity_record_key(&entity.partition_key, &entity.row_key);

        let existing = collection
            .get::<EntityRecord>(&key)?
            .ok_or_else(|| {
                StoreError::EntityNotFound(format!(
                    "{}/{}",
                    entity.partition_key, entity.row_key
                ))
            })?;

        if !batch_id.is_empty() {
            self.rollback_pre_images.write().unwrap().push(existing.clone());
        }
        check_etag(&existing.etag, if_match)?;

        let mut merged = existing;
        merged.etag = entity.etag;
        merged.last_modified_time = entity.last_modified_time;
        for (name, value) in &entity.properties {
            if name.ends_with(ODATA_TYPE_SUFFIX) {
                continue;
            }
            merged.properties.insert(name.clone(), value.clone());

            let tag_key = format!("{}{}", name, ODATA_TYPE_SUFFIX);
            match entity.properties.get(&tag_key) {
                Some(tag) => {
                    merged.properties.insert(tag_key, tag.clone());
                }
                None => {
                    merged.properties.remove(&tag_key);
                }
            }
        }
        merged.touch_timestamp();

        collection.put(&key, &merged)?;
        Ok(merged)
    }

    /// Delete an entity. The etag here is compared raw (`"*"` bypasses),
    /// unlike the encoded comparison of update/merge.
    pub fn delete_table_entity(
        &self,
        account: &str,
        table: &str,
        partition_key: Option<&str>,
        row_key: Option<&str>,
        if_match: &str,
        batch_id: &str,
    ) -> StoreResult<()> {
        self.ensure_open()?;
        let (partition_key, row_key) = match (partition_key, row_key) {
            (Some(p), Some(r)) => (p, r),
            _ => {
                return Err(StoreError::PropertiesNeedValue(
                    "partition key and row key are required".to_string(),
                ))
            }
        };

        let collection = self.entity_collection(account, table)?;
        let key = Self::entity_record_key(partition_key, row_key);
        let existing = collection
            .get::<EntityRecord>(&key)?
            .ok_or_else(|| {
                StoreError::EntityNotFound(format!("{}/{}", partition_key, row_key))
            })?;

        if if_match != "*" && existing.etag != if_match {
            return Err(StoreError::PreconditionFailed(format!(
                "etag mismatch: stored {}, if-match {}",
                existing.etag, if_match
            )));
        }

        if !batch_id.is_empty() {
            self.rollback_pre_images.write().unwrap().push(existing);
        }
        collection.delete(&key)?;
        Ok(())
    }
}
