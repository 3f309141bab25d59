//! Database abstraction layer for db-frames.
//!
//! Provides the trait-based connection contract the query executor works
//! against, the column-oriented result types, and the available backends.

mod mock;
mod postgres;
mod types;

pub use mock::{MockConnection, ResourceTracker};
pub use postgres::PostgresConnection;
pub use types::{
    ColumnValues, QueryResult, ResultColumn, SemanticType, TimeRange, TypedValues, Value,
};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
}

impl DatabaseBackend {
    /// Parses a backend from a string or URL scheme.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            _ => None,
        }
    }

    /// Returns the default port for this backend.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
        }
    }

    /// Returns the URL scheme for this backend.
    pub fn url_scheme(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
        }
    }
}

/// Creates a connection for the given backend and configuration.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
    match config.backend {
        DatabaseBackend::Postgres => {
            let connection = PostgresConnection::connect(config).await?;
            Ok(Box::new(connection))
        }
    }
}

/// A result column as described by the driver, before semantic mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeColumn {
    /// Column name.
    pub name: String,

    /// The driver's well-known type name (e.g. `INT8`, `TIMESTAMPTZ`).
    pub type_name: String,
}

impl NativeColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Raw textual bytes of one cell. `None` is SQL NULL.
pub type RawCell = Option<Vec<u8>>;

/// A live database connection.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Returns true if the connection can currently be used.
    fn is_connected(&self) -> bool;

    /// Prepares a statement from SQL text.
    async fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>>;

    /// Closes the connection.
    async fn close(&self) -> Result<()>;
}

/// A prepared statement. Dropping it releases the statement.
#[async_trait]
pub trait Statement: Send {
    /// Executes the statement without bound parameters.
    async fn query(&mut self) -> Result<Box<dyn RowCursor>>;
}

/// A stateful cursor over an executing query's rows. Dropping it releases the cursor.
#[async_trait]
pub trait RowCursor: Send {
    /// Returns the result columns in driver order.
    fn columns(&self) -> Result<Vec<NativeColumn>>;

    /// Moves to the next row. Returns false once the rows are exhausted or fetching failed.
    async fn advance(&mut self) -> bool;

    /// Scans the current row into `dest`, one buffer per column.
    fn scan(&mut self, dest: &mut [RawCell]) -> Result<()>;

    /// Returns the error that ended the row stream, if any.
    fn err(&mut self) -> Option<crate::error::FramesError>;
}
