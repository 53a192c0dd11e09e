pub mod error;
pub mod query;
pub mod storage;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use query::{FilterExpr, QueryTarget};
pub use storage::record::{format_timestamp, generate_etag};
pub use storage::{
    Collection, EntityRecord, ServicePropertiesRecord, StorageEngine, TableRecord,
};
pub use store::{
    QueryOptions, TableStore, QUERY_RESULT_MAX_NUM, SERVICES_COLLECTION, TABLES_COLLECTION,
};
