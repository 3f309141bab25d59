//! Error types for db-frames.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for db-frames operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramesError {
    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The statement could not be prepared (syntax errors, unknown relations, etc.)
    #[error("Prepare error: {0}")]
    Prepare(String),

    /// The prepared statement failed to execute.
    #[error("Execute error: {0}")]
    Execute(String),

    /// Result column metadata could not be read.
    #[error("Column metadata error: {0}")]
    ColumnMetadata(String),

    /// A row could not be scanned into raw cell buffers.
    #[error("Row scan error: {0}")]
    RowScan(String),

    /// The row cursor finished with an error.
    #[error("Cursor error: {0}")]
    Cursor(String),

    /// Clean end of the row stream, reported as an error by some drivers.
    #[error("End of stream")]
    EndOfStream,

    /// The inbound query descriptor payload did not match the expected shape.
    #[error("Descriptor error: {0}")]
    Descriptor(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FramesError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a statement preparation error with the given message.
    pub fn prepare(msg: impl Into<String>) -> Self {
        Self::Prepare(msg.into())
    }

    /// Creates a statement execution error with the given message.
    pub fn execute(msg: impl Into<String>) -> Self {
        Self::Execute(msg.into())
    }

    /// Creates a column metadata error with the given message.
    pub fn column_metadata(msg: impl Into<String>) -> Self {
        Self::ColumnMetadata(msg.into())
    }

    /// Creates a row scan error with the given message.
    pub fn row_scan(msg: impl Into<String>) -> Self {
        Self::RowScan(msg.into())
    }

    /// Creates a cursor error with the given message.
    pub fn cursor(msg: impl Into<String>) -> Self {
        Self::Cursor(msg.into())
    }

    /// Creates a descriptor parse error with the given message.
    pub fn descriptor(msg: impl Into<String>) -> Self {
        Self::Descriptor(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true for the clean end-of-stream condition.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Prepare(_) => "Prepare Error",
            Self::Execute(_) => "Execute Error",
            Self::ColumnMetadata(_) => "Column Metadata Error",
            Self::RowScan(_) => "Row Scan Error",
            Self::Cursor(_) | Self::EndOfStream => "Cursor Error",
            Self::Descriptor(_) => "Descriptor Error",
            Self::Config(_) => "Configuration Error",
        }
    }
}

/// Result type alias using FramesError.
pub type Result<T> = std::result::Result<T, FramesError>;
