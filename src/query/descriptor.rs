//! Query descriptor parsing.
//!
//! A descriptor is the inbound description of one query: the executable SQL,
//! its display text, the request identifier, the time range and the datasource
//! it targets.

use crate::db::TimeRange;
use crate::error::{FramesError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, error};

/// Every key a descriptor understands, at any nesting level.
const FIELD_NAMES: &[&str] = &[
    "datasource",
    "datasourceId",
    "intervalMs",
    "o_parsed",
    "o_sql",
    "refId",
    "timeRange",
    "type",
    "uid",
    "from",
    "to",
];

/// Reference to the datasource a query targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasourceRef {
    /// Datasource plugin type.
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub kind: String,

    /// Datasource unique id.
    #[serde(deserialize_with = "nullable")]
    pub uid: String,
}

/// One parsed query. Immutable once parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryDescriptor {
    #[serde(deserialize_with = "nullable")]
    pub datasource: DatasourceRef,

    #[serde(deserialize_with = "nullable")]
    pub datasource_id: i64,

    /// Polling interval in milliseconds.
    #[serde(deserialize_with = "nullable")]
    pub interval_ms: i64,

    /// Final executable SQL, with any templating already applied.
    #[serde(rename = "o_parsed", deserialize_with = "nullable")]
    pub sql: String,

    /// The query text as originally written, for display.
    #[serde(rename = "o_sql", deserialize_with = "nullable")]
    pub display_sql: String,

    /// Request identifier echoed back to the caller.
    #[serde(deserialize_with = "nullable")]
    pub ref_id: String,

    #[serde(deserialize_with = "nullable")]
    pub time_range: TimeRange,
}

impl QueryDescriptor {
    /// Parses a descriptor from a JSON payload.
    ///
    /// Field names match case-insensitively (`refId`, `RefId`, `REFID`).
    /// Missing fields and explicit nulls take zero values; unknown fields are ignored.
    pub fn parse(raw_json: &[u8]) -> Result<Self> {
        debug!("query descriptor json: {}", String::from_utf8_lossy(raw_json));
        serde_json::from_slice::<Value>(raw_json)
            .map(canonicalize_keys)
            .and_then(serde_json::from_value)
            .map_err(|e| {
                error!("Error parsing query descriptor: {e}");
                FramesError::descriptor(e.to_string())
            })
    }

    /// Creates a descriptor that executes the given SQL as-is.
    pub fn from_sql(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        Self {
            display_sql: sql.clone(),
            sql,
            ..Default::default()
        }
    }
}

/// Renames object keys that match a known field name ignoring case.
fn canonicalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let key = FIELD_NAMES
                        .iter()
                        .find(|name| name.eq_ignore_ascii_case(&key))
                        .map_or(key, |name| name.to_string());
                    (key, canonicalize_keys(value))
                })
                .collect(),
        ),
        other => other,
    }
}

/// Deserializes `null` as the type's zero value.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
