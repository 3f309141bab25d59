//! Integration tests for db-frames.

pub mod executor_test;
