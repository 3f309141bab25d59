//! Raw cell conversion.
//!
//! Malformed integer, float and timestamp cells convert to the type's zero
//! value instead of failing, so every column stays the same length as the row
//! set.

use crate::db::{SemanticType, TypedValues, Value};
use chrono::{DateTime, Utc};

/// Converts one non-NULL raw cell to a value of the given semantic type.
pub fn convert_cell(raw: &[u8], semantic_type: SemanticType) -> Value {
    match semantic_type {
        SemanticType::Int64 => Value::Int64(parse_int64(raw)),
        SemanticType::Float64 => Value::Float64(parse_float64(raw)),
        SemanticType::Timestamp => Value::Timestamp(parse_timestamp(raw)),
        SemanticType::Text => Value::Text(parse_text(raw)),
    }
}

/// Builds a dense column of the given type from already-converted values.
///
/// Absent entries, and entries of a different type, become the type default.
pub fn convert_column(semantic_type: SemanticType, source: &[Option<Value>]) -> TypedValues {
    match semantic_type {
        SemanticType::Int64 => TypedValues::Int64(collect(source, |v| match v {
            Value::Int64(i) => Some(*i),
            _ => None,
        })),
        SemanticType::Float64 => TypedValues::Float64(collect(source, |v| match v {
            Value::Float64(f) => Some(*f),
            _ => None,
        })),
        SemanticType::Timestamp => TypedValues::Timestamp(collect(source, |v| match v {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        })),
        SemanticType::Text => TypedValues::Text(collect(source, |v| match v {
            Value::Text(s) => Some(s.clone()),
            _ => None,
        })),
    }
}

fn collect<T: Default>(source: &[Option<Value>], extract: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    source
        .iter()
        .map(|v| v.as_ref().and_then(&extract).unwrap_or_default())
        .collect()
}

/// Parses a base-10 signed integer, or 0.
fn parse_int64(raw: &[u8]) -> i64 {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// Parses a 64-bit float, or 0.0.
fn parse_float64(raw: &[u8]) -> f64 {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// Parses an RFC 3339 date-time, or the Unix epoch.
fn parse_timestamp(raw: &[u8]) -> DateTime<Utc> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Interprets the bytes as UTF-8 text, replacing invalid sequences.
fn parse_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}
