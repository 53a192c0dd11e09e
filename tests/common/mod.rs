//! Shared test fixtures for the table store suites.

use chrono::Utc;
use serde_json::{Map, Value};
use tabledb::{generate_etag, EntityRecord, TableStore};
use tempfile::TempDir;

pub fn create_test_store() -> (TableStore, TempDir) {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = TableStore::new(tmp_dir.path()).expect("Failed to create table store");
    store.init().expect("Failed to initialize table store");
    (store, tmp_dir)
}

pub fn make_entity(partition_key: &str, row_key: &str, properties: Value) -> EntityRecord {
    let now = Utc::now();
    let props: Map<String, Value> = properties.as_object().cloned().unwrap_or_default();
    EntityRecord::new(partition_key, row_key, props, now, generate_etag(&now))
}
