use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// EDM type tag attached to the derived `Timestamp` property.
pub const EDM_DATETIME: &str = "Edm.DateTime";

/// Suffix of the companion keys carrying EDM type tags.
pub const ODATA_TYPE_SUFFIX: &str = "@odata.type";

/// One registered table, unique per `(account, table)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRecord {
    pub account: String,
    pub table: String,
    #[serde(rename = "tableAcl", default, skip_serializing_if = "Option::is_none")]
    pub table_acl: Option<Value>,
}

/// One stored entity, unique per `(PartitionKey, RowKey)` within its table.
///
/// `properties` keeps insertion order and holds both plain values and their
/// `<name>@odata.type` companions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(rename = "PartitionKey")]
    pub partition_key: String,
    #[serde(rename = "RowKey")]
    pub row_key: String,
    pub properties: Map<String, Value>,
    #[serde(rename = "lastModifiedTime")]
    pub last_modified_time: DateTime<Utc>,
    #[serde(rename = "eTag")]
    pub etag: String,
}

impl EntityRecord {
    pub fn new(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        properties: Map<String, Value>,
        last_modified_time: DateTime<Utc>,
        etag: impl Into<String>,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            properties,
            last_modified_time,
            etag: etag.into(),
        }
    }

    /// Recompute the derived `Timestamp` property and its type tag from
    /// `last_modified_time`. Called on every successful write.
    pub fn touch_timestamp(&mut self) {
        self.properties.insert(
            "Timestamp".to_string(),
            Value::String(format_timestamp(&self.last_modified_time)),
        );
        self.properties.insert(
            format!("Timestamp{}", ODATA_TYPE_SUFFIX),
            Value::String(EDM_DATETIME.to_string()),
        );
    }
}

/// Per-account service configuration. `account_name` is the unique key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePropertiesRecord {
    #[serde(rename = "accountName")]
    pub account_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors: Option<Value>,
    #[serde(rename = "hourMetrics", default, skip_serializing_if = "Option::is_none")]
    pub hour_metrics: Option<Value>,
    #[serde(
        rename = "minuteMetrics",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub minute_metrics: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<Value>,
}

/// Millisecond-precision RFC 3339 form with a `Z` suffix, the wire form of
/// the `Timestamp` property.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Weak etag in the service's `W/"datetime'...'"` form, with the timestamp
/// colons percent-encoded.
pub fn generate_etag(time: &DateTime<Utc>) -> String {
    format!(
        "W/\"datetime'{}'\"",
        format_timestamp(time).replace(':', "%3A")
    )
}
