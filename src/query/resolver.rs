//! Native column type resolution.
//!
//! Maps the driver's well-known type name for a result column onto one of the
//! four semantic types. The mapping is total: anything not recognized as an
//! integer, floating point or date/time type resolves to text, including
//! booleans and binary types.

use crate::db::SemanticType;

/// Resolves a native driver type name to its semantic type.
///
/// Names are matched case-insensitively, ignoring type parameters such as
/// `varchar(255)` or `timestamp(6) with time zone`. Integer names are checked
/// before floating point names.
pub fn resolve_type(native_type: &str) -> SemanticType {
    let name = normalize_type_name(native_type);

    if is_integer(&name) {
        SemanticType::Int64
    } else if is_float(&name) {
        SemanticType::Float64
    } else if is_timestamp(&name) {
        SemanticType::Timestamp
    } else {
        SemanticType::Text
    }
}

fn is_integer(name: &str) -> bool {
    matches!(
        name,
        "INT2"
            | "INT4"
            | "INT8"
            | "INT16"
            | "INT32"
            | "INT64"
            | "INT"
            | "INTEGER"
            | "SMALLINT"
            | "MEDIUMINT"
            | "TINYINT"
            | "BIGINT"
            | "SMALLSERIAL"
            | "SERIAL"
            | "BIGSERIAL"
            | "PLS_INTEGER"
            | "BINARY_INTEGER"
    )
}

fn is_float(name: &str) -> bool {
    matches!(
        name,
        "FLOAT4"
            | "FLOAT8"
            | "FLOAT"
            | "REAL"
            | "DOUBLE"
            | "DOUBLE PRECISION"
            | "NUMERIC"
            | "DECIMAL"
            | "NUMBER"
            | "BINARY_FLOAT"
            | "BINARY_DOUBLE"
    )
}

fn is_timestamp(name: &str) -> bool {
    name == "DATE"
        || name == "DATETIME"
        || name == "DATETIME2"
        || name == "DATETIMEOFFSET"
        || name.starts_with("TIMESTAMP")
}

/// Uppercases the name, drops parenthesized parameters and collapses whitespace.
fn normalize_type_name(native_type: &str) -> String {
    let mut stripped = String::with_capacity(native_type.len());
    let mut depth = 0usize;
    for ch in native_type.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(ch),
            _ => {}
        }
    }

    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}
