//! db-frames - executes SQL queries and turns the rows into typed,
//! column-oriented frames.
//!
//! This library exposes the core modules for use by the `frames` binary and
//! integration tests.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
