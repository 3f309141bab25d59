//! Query executor integration tests.
//!
//! Drives the full execution protocol against scripted mock connections.

use chrono::{TimeZone, Utc};
use db_frames::db::{ColumnValues, MockConnection, QueryResult, SemanticType, TimeRange, TypedValues};
use db_frames::error::FramesError;
use db_frames::query::{convert_column, QueryDescriptor, QueryExecutor};
use pretty_assertions::assert_eq;

fn time_range() -> TimeRange {
    TimeRange::new(
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap(),
    )
}

async fn run(conn: &MockConnection, sql: &str) -> QueryResult {
    QueryExecutor::new(conn)
        .execute(&QueryDescriptor::from_sql(sql), &time_range())
        .await
}

/// A connection with three typed columns and two rows.
fn metrics_connection() -> MockConnection {
    MockConnection::new()
        .with_column("ts", "TIMESTAMPTZ")
        .with_column("value", "FLOAT8")
        .with_column("host", "VARCHAR")
        .with_row([Some("2024-01-15T10:00:00Z"), Some("1.5"), Some("web-1")])
        .with_row([Some("2024-01-15T10:01:00Z"), None, Some("web-2")])
}

/// Scenario: 3 columns, 2 rows, second row's second cell is NULL
/// Then every column has 2 values
/// And the NULL cell is absent
/// And no error is set
#[tokio::test]
async fn test_null_cell_is_absent_and_columns_stay_aligned() {
    let conn = metrics_connection();
    let result = run(&conn, "SELECT ts, value, host FROM metrics").await;

    assert!(result.error.is_none());
    assert_eq!(result.columns.len(), 3);
    for column in &result.columns {
        assert_eq!(column.len(), 2, "column {}", column.name);
    }

    let value = result.column("value").unwrap();
    assert_eq!(value.semantic_type(), SemanticType::Float64);
    assert_eq!(value.values, ColumnValues::Float64(vec![Some(1.5), None]));

    // Made dense, the absent cell becomes the type default
    assert_eq!(value.values.to_typed(), TypedValues::Float64(vec![1.5, 0.0]));
    assert_eq!(
        convert_column(SemanticType::Float64, &value.values.to_values()),
        TypedValues::Float64(vec![1.5, 0.0])
    );

    let ts = result.column("ts").unwrap();
    assert_eq!(
        ts.values,
        ColumnValues::Timestamp(vec![
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 1, 0).unwrap()),
        ])
    );
}

/// Scenario: connection reports not connected
/// Then the result has no columns and no error
#[tokio::test]
async fn test_not_connected_returns_empty_result() {
    let conn = metrics_connection().disconnected();
    let result = run(&conn, "SELECT 1").await;

    assert!(result.columns.is_empty());
    assert!(result.error.is_none());
}

/// Scenario: statement preparation fails
/// Then the result has no columns and carries the preparation error
#[tokio::test]
async fn test_prepare_failure_is_recorded() {
    let error = FramesError::prepare("syntax error at or near \"FORM\"");
    let conn = metrics_connection().fail_prepare(error.clone());
    let result = run(&conn, "SELECT * FORM metrics").await;

    assert!(result.columns.is_empty());
    assert_eq!(result.error, Some(error));
}

/// Scenario: execution fails
/// Then the statement is still released
#[tokio::test]
async fn test_execute_failure_releases_statement() {
    let error = FramesError::execute("permission denied for table metrics");
    let conn = metrics_connection().fail_execute(error.clone());
    let tracker = conn.tracker();

    let result = run(&conn, "SELECT * FROM metrics").await;

    assert!(result.columns.is_empty());
    assert_eq!(result.error, Some(error));
    assert_eq!(tracker.open_statements(), 0);
    assert_eq!(tracker.open_cursors(), 0);
}

/// Scenario: column metadata cannot be read
/// Then the statement and cursor are still released
#[tokio::test]
async fn test_column_failure_releases_cursor() {
    let error = FramesError::column_metadata("unsupported type oid 16385");
    let conn = metrics_connection().fail_columns(error.clone());
    let tracker = conn.tracker();

    let result = run(&conn, "SELECT * FROM metrics").await;

    assert!(result.columns.is_empty());
    assert_eq!(result.error, Some(error));
    assert_eq!(tracker.open_statements(), 0);
    assert_eq!(tracker.open_cursors(), 0);
}

/// Scenario: scanning the second row fails
/// Then the first row is kept
/// And the scan error is recorded
#[tokio::test]
async fn test_scan_failure_keeps_partial_rows() {
    let error = FramesError::row_scan("column 'value': invalid length");
    let conn = metrics_connection().fail_scan_at(1, error.clone());
    let tracker = conn.tracker();

    let result = run(&conn, "SELECT ts, value, host FROM metrics").await;

    assert_eq!(result.error, Some(error));
    assert_eq!(result.columns.len(), 3);
    assert_eq!(result.row_count(), 1);
    for column in &result.columns {
        assert_eq!(column.len(), 1, "column {}", column.name);
    }
    assert_eq!(
        result.column("host").unwrap().values,
        ColumnValues::Text(vec![Some("web-1".to_string())])
    );
    assert_eq!(tracker.open_cursors(), 0);
}

/// Scenario: the cursor ends with an error after delivering its rows
/// Then the cursor's own error is recorded
/// And the rows are kept
#[tokio::test]
async fn test_cursor_error_is_recorded() {
    let error = FramesError::cursor("server closed the connection unexpectedly");
    let conn = metrics_connection().fail_cursor(error.clone());

    let result = run(&conn, "SELECT ts, value, host FROM metrics").await;

    assert_eq!(result.error, Some(error));
    assert_eq!(result.row_count(), 2);
}

/// Scenario: the query returns columns but no rows
/// Then the columns are present and empty
#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let conn = MockConnection::new()
        .with_column("id", "INT8")
        .with_column("created", "DATE");

    let result = run(&conn, "SELECT id, created FROM users WHERE 1 = 0").await;

    assert!(result.is_ok());
    assert_eq!(result.columns.len(), 2);
    assert_eq!(result.row_count(), 0);
    assert_eq!(result.columns[1].semantic_type(), SemanticType::Timestamp);
}

/// Scenario: cells that do not parse as their column type
/// Then they become the type's zero value without an error
#[tokio::test]
async fn test_malformed_cells_become_zero() {
    let conn = MockConnection::new()
        .with_column("n", "INT4")
        .with_column("ts", "TIMESTAMP")
        .with_row([Some("not_a_number"), Some("yesterday")]);

    let result = run(&conn, "SELECT n, ts FROM t").await;

    assert!(result.is_ok());
    assert_eq!(result.columns[0].values, ColumnValues::Int64(vec![Some(0)]));
    assert_eq!(
        result.columns[1].values,
        ColumnValues::Timestamp(vec![Some(Utc.timestamp_opt(0, 0).unwrap())])
    );
}

/// Scenario: booleans, blobs and unknown types
/// Then they are carried as text
#[tokio::test]
async fn test_unrecognized_types_are_text() {
    let conn = MockConnection::new()
        .with_column("flag", "BOOL")
        .with_column("id", "UUID")
        .with_row([Some("true"), Some("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11")]);

    let result = run(&conn, "SELECT flag, id FROM t").await;

    assert_eq!(
        result.columns[0].values,
        ColumnValues::Text(vec![Some("true".to_string())])
    );
    assert_eq!(result.columns[1].semantic_type(), SemanticType::Text);
}

/// Scenario: a successful run
/// Then nothing stays open
/// And the descriptor's executable SQL is what gets prepared
#[tokio::test]
async fn test_success_releases_everything() {
    let conn = metrics_connection();
    let tracker = conn.tracker();

    let query = QueryDescriptor::parse(
        br#"{"refId": "A", "o_sql": "SELECT $__time(ts)", "o_parsed": "SELECT ts FROM metrics"}"#,
    )
    .unwrap();
    let result = QueryExecutor::new(&conn).execute(&query, &time_range()).await;

    assert!(result.is_ok());
    assert_eq!(tracker.open_statements(), 0);
    assert_eq!(tracker.open_cursors(), 0);
    assert_eq!(conn.prepared_sql(), vec!["SELECT ts FROM metrics".to_string()]);
}

/// Scenario: the result is serialized for the caller
/// Then each column carries its name, type and values
#[tokio::test]
async fn test_result_serializes_column_oriented() {
    let conn = MockConnection::new()
        .with_column("id", "INT8")
        .with_column("name", "TEXT")
        .with_row([Some("1"), Some("alpha")])
        .with_row([Some("2"), None]);

    let result = run(&conn, "SELECT id, name FROM t").await;
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "error": null,
            "columns": [
                {"name": "id", "type": "int64", "values": [1, 2]},
                {"name": "name", "type": "string", "values": ["alpha", null]}
            ]
        })
    );
}
