//! Query execution and result typing for db-frames.
//!
//! Resolves native column types, converts raw cells, parses inbound query
//! descriptors and drives statement execution.

pub mod convert;
pub mod descriptor;
pub mod executor;
pub mod resolver;

pub use convert::{convert_cell, convert_column};
pub use descriptor::{DatasourceRef, QueryDescriptor};
pub use executor::QueryExecutor;
pub use resolver::resolve_type;
