use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use super::{TableStore, QUERY_RESULT_MAX_NUM};
use crate::error::{StoreError, StoreResult};
use crate::query::{self, QueryTarget};
use crate::storage::record::{EntityRecord, TableRecord};

/// Options shared by the paginated queries.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Page size; defaults to [`QUERY_RESULT_MAX_NUM`]
    pub top: Option<usize>,
    /// OData filter expression
    pub filter: Option<String>,
}

fn encode_continuation(key: &str) -> String {
    BASE64.encode(key.as_bytes())
}

/// Continuation keys travel in HTTP headers, so they are Base64-encoded
/// per key. Decoding is forgiving: a token that is not valid Base64 decodes
/// to an empty string rather than failing the query.
fn decode_continuation(token: &str) -> String {
    BASE64
        .decode(token)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

impl TableStore {
    /// List an account's tables, filtered, sorted ascending by table name,
    /// with `top + 1` probing for the continuation cursor.
    pub fn query_table(
        &self,
        account: &str,
        options: &QueryOptions,
        next_table: Option<&str>,
    ) -> StoreResult<(Vec<TableRecord>, Option<String>)> {
        self.ensure_open()?;
        let predicate = query::compile(options.filter.as_deref(), QueryTarget::Table)?;
        let continuation = next_table.map(decode_continuation);
        let top = options.top.unwrap_or(QUERY_RESULT_MAX_NUM);

        let mut matches: Vec<TableRecord> = self
            .tables_collection()?
            .scan::<TableRecord>()
            .into_iter()
            .filter(|record| record.account == account)
            .filter(|record| {
                continuation
                    .as_deref()
                    .map_or(true, |next| record.table.as_str() >= next)
            })
            .filter(|record| predicate.matches(record))
            .collect();
        matches.sort_by(|a, b| a.table.cmp(&b.table));
        matches.truncate(top + 1);

        let next = if matches.len() > top {
            matches.pop().map(|record| encode_continuation(&record.table))
        } else {
            None
        };
        Ok((matches, next))
    }

    /// Scan a table's entities, filtered and continuation-bounded, sorted
    /// ascending by `(PartitionKey, RowKey)`.
    pub fn query_table_entities(
        &self,
        account: &str,
        table: &str,
        options: &QueryOptions,
        next_partition_key: Option<&str>,
        next_row_key: Option<&str>,
    ) -> StoreResult<(Vec<EntityRecord>, Option<(String, String)>)> {
        self.ensure_open()?;
        let collection = self.entity_collection(account, table)?;
        let predicate = query::compile(options.filter.as_deref(), QueryTarget::Entity)?;

        // Continuation applies only when both keys are present.
        let continuation = match (next_partition_key, next_row_key) {
            (Some(partition), Some(row)) => {
                Some((decode_continuation(partition), decode_continuation(row)))
            }
            _ => None,
        };
        let top = options.top.unwrap_or(QUERY_RESULT_MAX_NUM);

        let mut matches: Vec<EntityRecord> = collection
            .scan::<EntityRecord>()
            .into_iter()
            .filter(|entity| predicate.matches(entity))
            .filter(|entity| match &continuation {
                None => true,
                Some((next_partition, next_row)) => {
                    entity.partition_key.as_str() > next_partition.as_str()
                        || (entity.row_key.as_str() >= next_row.as_str()
                            && entity.partition_key.as_str() == next_partition.as_str())
                }
            })
            .collect();
        matches.sort_by(|a, b| {
            (a.partition_key.as_str(), a.row_key.as_str())
                .cmp(&(b.partition_key.as_str(), b.row_key.as_str()))
        });
        matches.truncate(top + 1);

        let next = if matches.len() > top {
            matches.pop().map(|entity| {
                (
                    encode_continuation(&entity.partition_key),
                    encode_continuation(&entity.row_key),
                )
            })
        } else {
            None
        };
        Ok((matches, next))
    }

    /// Direct primary-key lookup. An absent entity is not an error.
    pub fn query_table_entities_with_partition_and_row_key(
        &self,
        account: &str,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> StoreResult<Option<EntityRecord>> {
        self.ensure_open()?;
        let collection = self
            .engine()
            .get_collection(&Self::entity_collection_name(account, table))
            .ok_or_else(|| StoreError::TableNotExist(table.to_string()))?;
        collection.get(&Self::entity_record_key(partition_key, row_key))
    }
}
