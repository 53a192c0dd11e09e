//! Table lifecycle tests: create/delete/get, ACLs, access policies, the
//! table query, and store lifecycle (close, reopen).

mod common;

use common::{create_test_store, make_entity};
use serde_json::json;
use tabledb::{QueryOptions, StoreError, TableStore};

// ============================================================================
// Create / Get / Delete
// ============================================================================

#[test]
fn test_create_table_and_get() {
    let (store, _tmp) = create_test_store();

    store.create_table("acct", "orders").unwrap();

    let table = store.get_table("acct", "orders").unwrap();
    assert_eq!(table.account, "acct");
    assert_eq!(table.table, "orders");
    assert!(table.table_acl.is_none());

    // The entity collection exists and is empty.
    let entity = store
        .query_table_entities_with_partition_and_row_key("acct", "orders", "p", "r")
        .unwrap();
    assert!(entity.is_none());
}

#[test]
fn test_create_duplicate_table_fails() {
    let (store, _tmp) = create_test_store();

    store.create_table("acct", "orders").unwrap();
    let err = store.create_table("acct", "orders").unwrap_err();
    assert!(matches!(err, StoreError::TableAlreadyExists(_)));
}

#[test]
fn test_same_table_name_across_accounts() {
    let (store, _tmp) = create_test_store();

    store.create_table("alpha", "orders").unwrap();
    store.create_table("beta", "orders").unwrap();

    assert!(store.get_table("alpha", "orders").is_ok());
    assert!(store.get_table("beta", "orders").is_ok());
}

#[test]
fn test_table_names_are_case_sensitive() {
    let (store, _tmp) = create_test_store();

    store.create_table("acct", "Orders").unwrap();
    store.create_table("acct", "orders").unwrap();

    assert!(store.get_table("acct", "Orders").is_ok());
    assert!(store.get_table("acct", "orders").is_ok());
}

#[test]
fn test_delete_table_drops_entities() {
    let (store, _tmp) = create_test_store();

    store.create_table("acct", "orders").unwrap();
    store
        .insert_table_entity("acct", "orders", make_entity("p", "r", json!({"x": 1})), "")
        .unwrap();

    store.delete_table("acct", "orders").unwrap();

    let err = store.get_table("acct", "orders").unwrap_err();
    assert!(matches!(err, StoreError::TableNotFound(_)));

    // Every entity operation now fails with table-not-exist.
    let err = store
        .insert_table_entity("acct", "orders", make_entity("p", "r2", json!({})), "")
        .unwrap_err();
    assert!(matches!(err, StoreError::TableNotExist(_)));

    let err = store
        .query_table_entities("acct", "orders", &QueryOptions::default(), None, None)
        .unwrap_err();
    assert!(matches!(err, StoreError::TableNotExist(_)));

    let err = store
        .query_table_entities_with_partition_and_row_key("acct", "orders", "p", "r")
        .unwrap_err();
    assert!(matches!(err, StoreError::TableNotExist(_)));
}

#[test]
fn test_delete_missing_table() {
    let (store, _tmp) = create_test_store();

    let err = store.delete_table("acct", "ghost").unwrap_err();
    assert!(matches!(err, StoreError::ResourceNotFound(_)));
}

#[test]
fn test_recreate_after_delete() {
    let (store, _tmp) = create_test_store();

    store.create_table("acct", "orders").unwrap();
    store
        .insert_table_entity("acct", "orders", make_entity("p", "r", json!({"x": 1})), "")
        .unwrap();
    store.delete_table("acct", "orders").unwrap();
    store.create_table("acct", "orders").unwrap();

    // The recreated table starts empty.
    let entity = store
        .query_table_entities_with_partition_and_row_key("acct", "orders", "p", "r")
        .unwrap();
    assert!(entity.is_none());
}

#[test]
fn test_get_missing_table() {
    let (store, _tmp) = create_test_store();

    let err = store.get_table("acct", "ghost").unwrap_err();
    assert!(matches!(err, StoreError::TableNotFound(_)));
}

// ============================================================================
// ACLs and Access Policies
// ============================================================================

#[test]
fn test_set_table_acl() {
    let (store, _tmp) = create_test_store();
    store.create_table("acct", "orders").unwrap();

    let acl = json!([{"id": "policy1", "accessPolicy": {"permission": "raud"}}]);
    let updated = store
        .set_table_acl("acct", "orders", Some(acl.clone()))
        .unwrap();
    assert_eq!(updated.table_acl, Some(acl.clone()));
    assert_eq!(store.get_table("acct", "orders").unwrap().table_acl, Some(acl));

    // The ACL may also be cleared.
    let updated = store.set_table_acl("acct", "orders", None).unwrap();
    assert!(updated.table_acl.is_none());
}

#[test]
fn test_set_table_acl_missing_table() {
    let (store, _tmp) = create_test_store();

    let err = store.set_table_acl("acct", "ghost", None).unwrap_err();
    assert!(matches!(err, StoreError::TableNotFound(_)));
}

#[test]
fn test_access_policies_not_implemented() {
    let (store, _tmp) = create_test_store();
    store.create_table("acct", "orders").unwrap();

    let err = store.get_table_access_policy("acct", "orders").unwrap_err();
    assert!(matches!(err, StoreError::NotImplemented(_)));

    let err = store
        .set_table_access_policy("acct", "orders", json!({}))
        .unwrap_err();
    assert!(matches!(err, StoreError::NotImplemented(_)));
}

// ============================================================================
// Table Query
// ============================================================================

#[test]
fn test_query_table_scoped_to_account() {
    let (store, _tmp) = create_test_store();

    for name in ["alpha", "beta", "gamma"] {
        store.create_table("acct", name).unwrap();
    }
    store.create_table("other", "delta").unwrap();

    let (tables, next) = store
        .query_table("acct", &QueryOptions::default(), None)
        .unwrap();
    assert_eq!(tables.len(), 3);
    assert!(next.is_none());

    // Ascending by table name.
    let names: Vec<&str> = tables.iter().map(|t| t.table.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);
}

#[test]
fn test_query_table_filter() {
    let (store, _tmp) = create_test_store();

    for name in ["alpha", "beta", "gamma"] {
        store.create_table("acct", name).unwrap();
    }

    let options = QueryOptions {
        top: None,
        filter: Some("TableName eq 'beta'".to_string()),
    };
    let (tables, _) = store.query_table("acct", &options, None).unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].table, "beta");
}

#[test]
fn test_query_table_rejects_custom_properties() {
    let (store, _tmp) = create_test_store();

    let options = QueryOptions {
        top: None,
        filter: Some("Color eq 'red'".to_string()),
    };
    let err = store.query_table("acct", &options, None).unwrap_err();
    assert!(matches!(err, StoreError::QueryConditionInvalid(_)));
}

#[test]
fn test_query_table_pagination() {
    let (store, _tmp) = create_test_store();

    for i in 0..5 {
        store.create_table("acct", &format!("table{}", i)).unwrap();
    }

    let options = QueryOptions {
        top: Some(2),
        filter: None,
    };
    let (page1, next) = store.query_table("acct", &options, None).unwrap();
    assert_eq!(page1.len(), 2);
    let next = next.expect("expected a continuation token");

    let (page2, next) = store.query_table("acct", &options, Some(next.as_str())).unwrap();
    assert_eq!(page2.len(), 2);
    let next = next.expect("expected a continuation token");

    let (page3, next) = store.query_table("acct", &options, Some(next.as_str())).unwrap();
    assert_eq!(page3.len(), 1);
    assert!(next.is_none());

    let mut all: Vec<String> = Vec::new();
    for page in [page1, page2, page3] {
        all.extend(page.into_iter().map(|t| t.table));
    }
    assert_eq!(all, vec!["table0", "table1", "table2", "table3", "table4"]);
}

// ============================================================================
// Store Lifecycle
// ============================================================================

#[test]
fn test_close_makes_operations_fail() {
    let (store, _tmp) = create_test_store();
    store.create_table("acct", "orders").unwrap();

    store.close().unwrap();
    assert!(store.is_closed());

    let err = store.create_table("acct", "other").unwrap_err();
    assert!(matches!(err, StoreError::StoreClosed));

    let err = store.get_table("acct", "orders").unwrap_err();
    assert!(matches!(err, StoreError::StoreClosed));

    // Close is idempotent.
    assert!(store.close().is_ok());
}

#[test]
fn test_reopen_preserves_data() {
    let tmp_dir = tempfile::TempDir::new().unwrap();

    {
        let store = TableStore::new(tmp_dir.path()).unwrap();
        store.init().unwrap();
        store.create_table("acct", "orders").unwrap();
        store
            .insert_table_entity("acct", "orders", make_entity("p", "r", json!({"x": 1})), "")
            .unwrap();
        store.close().unwrap();
    }

    let store = TableStore::new(tmp_dir.path()).unwrap();
    store.init().unwrap();

    assert!(store.get_table("acct", "orders").is_ok());
    let entity = store
        .query_table_entities_with_partition_and_row_key("acct", "orders", "p", "r")
        .unwrap()
        .expect("entity should survive reopen");
    assert_eq!(entity.properties.get("x"), Some(&json!(1)));
}
