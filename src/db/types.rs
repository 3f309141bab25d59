//! Query result types for db-frames.
//!
//! Defines the column-oriented structures produced by query execution.

use crate::error::FramesError;
use crate::query::convert;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of column types used for typed rendering downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    /// 64-bit signed integer.
    #[serde(rename = "int64")]
    Int64,

    /// 64-bit IEEE floating point.
    #[serde(rename = "float64")]
    Float64,

    /// Point in time, normalized to UTC.
    #[serde(rename = "time")]
    Timestamp,

    /// Text; also the fallback for every unrecognized native type.
    #[serde(rename = "string")]
    Text,
}

impl SemanticType {
    /// Returns the type as a string for display and serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Timestamp => "time",
            Self::Text => "string",
        }
    }

    /// Returns the value substituted for absent cells when a column is made dense.
    pub fn default_value(&self) -> Value {
        match self {
            Self::Int64 => Value::Int64(0),
            Self::Float64 => Value::Float64(0.0),
            Self::Timestamp => Value::Timestamp(DateTime::<Utc>::default()),
            Self::Text => Value::Text(String::new()),
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single concrete cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int64(i64),
    Float64(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl Value {
    /// Returns the semantic type this value belongs to.
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Value::Int64(_) => SemanticType::Int64,
            Value::Float64(_) => SemanticType::Float64,
            Value::Timestamp(_) => SemanticType::Timestamp,
            Value::Text(_) => SemanticType::Text,
        }
    }
}

/// The values of one result column, one entry per row.
///
/// `None` is the absent marker for a database NULL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values")]
pub enum ColumnValues {
    #[serde(rename = "int64")]
    Int64(Vec<Option<i64>>),
    #[serde(rename = "float64")]
    Float64(Vec<Option<f64>>),
    #[serde(rename = "time")]
    Timestamp(Vec<Option<DateTime<Utc>>>),
    #[serde(rename = "string")]
    Text(Vec<Option<String>>),
}

impl ColumnValues {
    /// Creates an empty sequence for the given type.
    pub fn new(semantic_type: SemanticType) -> Self {
        match semantic_type {
            SemanticType::Int64 => Self::Int64(Vec::new()),
            SemanticType::Float64 => Self::Float64(Vec::new()),
            SemanticType::Timestamp => Self::Timestamp(Vec::new()),
            SemanticType::Text => Self::Text(Vec::new()),
        }
    }

    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Self::Int64(_) => SemanticType::Int64,
            Self::Float64(_) => SemanticType::Float64,
            Self::Timestamp(_) => SemanticType::Timestamp,
            Self::Text(_) => SemanticType::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int64(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Timestamp(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends one raw cell, converting it to this sequence's type.
    ///
    /// `None` (SQL NULL) is recorded as absent without conversion.
    pub fn push_raw(&mut self, raw: Option<&[u8]>) {
        let value = raw.map(|raw| convert::convert_cell(raw, self.semantic_type()));
        self.push(value);
    }

    /// Appends one value. A value of another type is recorded as absent.
    pub fn push(&mut self, value: Option<Value>) {
        match (self, value) {
            (Self::Int64(v), Some(Value::Int64(i))) => v.push(Some(i)),
            (Self::Float64(v), Some(Value::Float64(f))) => v.push(Some(f)),
            (Self::Timestamp(v), Some(Value::Timestamp(t))) => v.push(Some(t)),
            (Self::Text(v), Some(Value::Text(s))) => v.push(Some(s)),
            (Self::Int64(v), _) => v.push(None),
            (Self::Float64(v), _) => v.push(None),
            (Self::Timestamp(v), _) => v.push(None),
            (Self::Text(v), _) => v.push(None),
        }
    }

    /// Returns the value at `index`, or `None` when absent or out of range.
    pub fn value(&self, index: usize) -> Option<Value> {
        match self {
            Self::Int64(v) => v.get(index).copied().flatten().map(Value::Int64),
            Self::Float64(v) => v.get(index).copied().flatten().map(Value::Float64),
            Self::Timestamp(v) => v.get(index).copied().flatten().map(Value::Timestamp),
            Self::Text(v) => v.get(index).cloned().flatten().map(Value::Text),
        }
    }

    /// Returns the values as a heterogeneous sequence.
    pub fn to_values(&self) -> Vec<Option<Value>> {
        (0..self.len()).map(|i| self.value(i)).collect()
    }

    /// Returns a dense sequence with every absent entry replaced by the type default.
    pub fn to_typed(&self) -> TypedValues {
        match self {
            Self::Int64(v) => {
                TypedValues::Int64(v.iter().map(|x| x.unwrap_or_default()).collect())
            }
            Self::Float64(v) => {
                TypedValues::Float64(v.iter().map(|x| x.unwrap_or_default()).collect())
            }
            Self::Timestamp(v) => {
                TypedValues::Timestamp(v.iter().map(|x| x.unwrap_or_default()).collect())
            }
            Self::Text(v) => {
                TypedValues::Text(v.iter().map(|x| x.clone().unwrap_or_default()).collect())
            }
        }
    }
}

/// A dense, homogeneous column with no absent entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values")]
pub enum TypedValues {
    #[serde(rename = "int64")]
    Int64(Vec<i64>),
    #[serde(rename = "float64")]
    Float64(Vec<f64>),
    #[serde(rename = "time")]
    Timestamp(Vec<DateTime<Utc>>),
    #[serde(rename = "string")]
    Text(Vec<String>),
}

impl TypedValues {
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Self::Int64(_) => SemanticType::Int64,
            Self::Float64(_) => SemanticType::Float64,
            Self::Timestamp(_) => SemanticType::Timestamp,
            Self::Text(_) => SemanticType::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int64(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Timestamp(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One named, typed column of a query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultColumn {
    /// Column name, unique within a result.
    pub name: String,

    /// Values in row arrival order.
    #[serde(flatten)]
    pub values: ColumnValues,
}

impl ResultColumn {
    /// Creates an empty column with the given name and type.
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::new(semantic_type),
        }
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.values.semantic_type()
    }

    /// Returns the number of values (rows) in the column.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends one raw cell from the driver.
    pub fn append(&mut self, raw: Option<&[u8]>) {
        self.values.push_raw(raw);
    }
}

/// The outcome of executing one query.
///
/// When `error` is set, `columns` still holds whatever was gathered before the failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// First failure encountered, if any.
    #[serde(serialize_with = "error_serde::serialize")]
    pub error: Option<FramesError>,

    /// Result columns in driver-reported order.
    pub columns: Vec<ResultColumn>,
}

impl QueryResult {
    /// Creates a new empty, error-free result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a result carrying only an error.
    pub fn failed(error: FramesError) -> Self {
        Self {
            error: Some(error),
            columns: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the number of rows, which every column shares.
    pub fn row_count(&self) -> usize {
        self.columns.first().map(ResultColumn::len).unwrap_or(0)
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ResultColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// The time range a query was issued for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default)]
    pub from: DateTime<Utc>,
    #[serde(default)]
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }
}

/// Errors are serialized as their display string.
mod error_serde {
    use crate::error::FramesError;
    use serde::Serializer;

    pub fn serialize<S>(error: &Option<FramesError>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match error {
            Some(e) => serializer.serialize_some(&e.to_string()),
            None => serializer.serialize_none(),
        }
    }
}
