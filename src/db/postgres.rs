//! PostgreSQL connection implementation.
//!
//! Provides `PostgresConnection`, which implements the `Connection` trait for
//! PostgreSQL databases using sqlx.
//!
//! Statements are prepared for validation and column metadata, then run over
//! the simple query protocol so every cell arrives in PostgreSQL's own text
//! format. Rows are streamed from a background task into the cursor.

use crate::config::ConnectionConfig;
use crate::db::{Connection, NativeColumn, RawCell, RowCursor, Statement};
use crate::error::{FramesError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use futures::StreamExt;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column as _, Executor as _, Row as _, TypeInfo as _, ValueRef as _};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Maximum number of pooled connections.
const MAX_CONNECTIONS: u32 = 5;

/// Time to wait for a pooled connection, in seconds.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Rows buffered between the fetch task and the cursor.
const ROW_BUFFER: usize = 256;

type RowMessage = std::result::Result<PgRow, sqlx::Error>;

/// PostgreSQL connection.
#[derive(Debug)]
pub struct PostgresConnection {
    pool: PgPool,
}

impl PostgresConnection {
    /// Connects to the database described by `config`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;
        debug!("Connecting to {}", config.display_string());

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect(&conn_str)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Successfully connected to database");
        Ok(Self { pool })
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    fn is_connected(&self) -> bool {
        !self.pool.is_closed()
    }

    async fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>> {
        let statement = self
            .pool
            .prepare(sql)
            .await
            .map_err(|e| FramesError::prepare(format_query_error(e)))?;

        let columns = sqlx::Statement::columns(&statement)
            .iter()
            .map(|col| NativeColumn::new(col.name(), col.type_info().name()))
            .collect();

        Ok(Box::new(PostgresStatement {
            pool: self.pool.clone(),
            sql: sql.to_string(),
            columns,
        }))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// A statement validated by the server, with its column metadata.
struct PostgresStatement {
    pool: PgPool,
    sql: String,
    columns: Vec<NativeColumn>,
}

#[async_trait]
impl Statement for PostgresStatement {
    async fn query(&mut self) -> Result<Box<dyn RowCursor>> {
        let (tx, rx) = mpsc::channel(ROW_BUFFER);
        let pool = self.pool.clone();
        let sql = self.sql.clone();

        // An unbound &str runs over the simple query protocol, which returns text cells
        let task = tokio::spawn(async move {
            let mut rows = pool.fetch(sql.as_str());
            while let Some(row) = rows.next().await {
                let failed = row.is_err();
                if tx.send(row).await.is_err() || failed {
                    break;
                }
            }
        });

        let mut cursor = PostgresCursor {
            columns: self.columns.clone(),
            rows: rx,
            task,
            pending: None,
            current: None,
            error: None,
        };

        // Errors raised before the first row are execution failures
        match cursor.rows.recv().await {
            Some(Ok(row)) => cursor.pending = Some(row),
            Some(Err(e)) => return Err(FramesError::execute(format_query_error(e))),
            None => {}
        }

        Ok(Box::new(cursor))
    }
}

/// Cursor over the rows streamed by a fetch task. Dropping it stops the task.
struct PostgresCursor {
    columns: Vec<NativeColumn>,
    rows: mpsc::Receiver<RowMessage>,
    task: JoinHandle<()>,
    pending: Option<PgRow>,
    current: Option<PgRow>,
    error: Option<FramesError>,
}

impl Drop for PostgresCursor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl RowCursor for PostgresCursor {
    fn columns(&self) -> Result<Vec<NativeColumn>> {
        Ok(self.columns.clone())
    }

    async fn advance(&mut self) -> bool {
        let next = match self.pending.take() {
            Some(row) => Some(Ok(row)),
            None => self.rows.recv().await,
        };

        match next {
            Some(Ok(row)) => {
                self.current = Some(row);
                true
            }
            Some(Err(e)) => {
                self.current = None;
                self.error = Some(FramesError::cursor(format_query_error(e)));
                false
            }
            None => {
                self.current = None;
                false
            }
        }
    }

    fn scan(&mut self, dest: &mut [RawCell]) -> Result<()> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| FramesError::row_scan("scan called without a current row"))?;

        if dest.len() != self.columns.len() {
            return Err(FramesError::row_scan(format!(
                "expected {} destination buffers, got {}",
                self.columns.len(),
                dest.len()
            )));
        }

        for (index, (slot, column)) in dest.iter_mut().zip(&self.columns).enumerate() {
            *slot = read_cell(row, index, &column.type_name)
                .map_err(|e| FramesError::row_scan(format!("column '{}': {e}", column.name)))?;
        }

        Ok(())
    }

    fn err(&mut self) -> Option<FramesError> {
        self.error.take()
    }
}

/// Reads one text-format cell of a PgRow.
fn read_cell(
    row: &PgRow,
    index: usize,
    type_name: &str,
) -> std::result::Result<RawCell, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(None);
    }

    let bytes = raw.as_bytes().map_err(sqlx::Error::Decode)?;
    Ok(Some(match timestamp_to_rfc3339(type_name, bytes) {
        Some(text) => text.into_bytes(),
        None => bytes.to_vec(),
    }))
}

/// Rewrites PostgreSQL's ISO date/time output as RFC 3339 in UTC.
///
/// Returns None for other types and for values chrono cannot represent
/// (`infinity`, BC dates), which are passed on unchanged.
fn timestamp_to_rfc3339(type_name: &str, text: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(text).ok()?;
    match type_name {
        "TIMESTAMPTZ" => DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z")
            .ok()
            .map(|t| t.with_timezone(&Utc).to_rfc3339()),
        "TIMESTAMP" => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .map(|t| Utc.from_utc_datetime(&t).to_rfc3339()),
        "DATE" => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::default())).to_rfc3339()),
        _ => None,
    }
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> FramesError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        FramesError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        FramesError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        FramesError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        FramesError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        FramesError::connection(error.to_string())
    }
}

/// Formats a query error with detail and hint if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        let fields = [
            ("DETAIL", pg_error.detail()),
            ("HINT", pg_error.hint()),
            ("TABLE", pg_error.table()),
            ("COLUMN", pg_error.column()),
            ("CONSTRAINT", pg_error.constraint()),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                result.push_str(&format!("\n  {label}: {value}"));
            }
        }
    }

    result
}
