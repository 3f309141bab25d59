//! Query execution into column-oriented results.
//!
//! Runs one query descriptor against a borrowed connection: prepare, execute,
//! enumerate columns, resolve each column's semantic type, then scan rows and
//! convert every cell into its column. Failures are logged and recorded on the
//! returned result instead of being returned as `Err`, and whatever was
//! gathered before a failure is kept.

use std::collections::HashSet;

use crate::db::{Connection, NativeColumn, QueryResult, RawCell, ResultColumn, TimeRange};
use crate::query::descriptor::QueryDescriptor;
use crate::query::resolver::resolve_type;
use tracing::{debug, error, warn};

/// Executes queries against a single connection.
pub struct QueryExecutor<'a> {
    connection: &'a dyn Connection,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor borrowing `connection`.
    pub fn new(connection: &'a dyn Connection) -> Self {
        Self { connection }
    }

    /// Executes `query` and collects its rows column by column.
    ///
    /// A connection that is not usable yields an empty, error-free result.
    /// `time_range` describes what the query is about; it does not bound
    /// execution time.
    pub async fn execute(&self, query: &QueryDescriptor, time_range: &TimeRange) -> QueryResult {
        let mut result = QueryResult::new();

        if !self.connection.is_connected() {
            warn!("Connection is not established, skipping query {}", query.ref_id);
            return result;
        }

        debug!(
            ref_id = %query.ref_id,
            from = %time_range.from,
            to = %time_range.to,
            "executing query"
        );

        let mut statement = match self.connection.prepare(&query.sql).await {
            Ok(statement) => statement,
            Err(e) => {
                error!("Error preparing SQL: {e}");
                result.error = Some(e);
                return result;
            }
        };

        let mut cursor = match statement.query().await {
            Ok(cursor) => cursor,
            Err(e) => {
                error!("Error querying SQL: {e}");
                result.error = Some(e);
                return result;
            }
        };

        let native_columns = match cursor.columns() {
            Ok(columns) => columns,
            Err(e) => {
                error!("Error fetching columns: {e}");
                result.error = Some(e);
                return result;
            }
        };

        result.columns = build_columns(&native_columns);

        let mut cells: Vec<RawCell> = vec![None; native_columns.len()];
        while cursor.advance().await {
            if let Err(e) = cursor.scan(&mut cells) {
                error!("Error scanning row: {e}");
                result.error = Some(e);
                break;
            }
            for (column, cell) in result.columns.iter_mut().zip(&cells) {
                column.append(cell.as_deref());
            }
        }

        if result.error.is_none() {
            if let Some(e) = cursor.err().filter(|e| !e.is_end_of_stream()) {
                error!("Error fetching row: {e}");
                result.error = Some(e);
            }
        }

        drop(cursor);
        drop(statement);

        debug!(
            ref_id = %query.ref_id,
            columns = result.columns.len(),
            rows = result.row_count(),
            "query finished"
        );
        result
    }
}

/// Creates one empty, typed result column per native column, in order.
///
/// Repeated names get a `_1`, `_2`, ... suffix so names stay unique.
fn build_columns(native_columns: &[NativeColumn]) -> Vec<ResultColumn> {
    let mut seen = HashSet::new();
    native_columns
        .iter()
        .map(|native| {
            let semantic_type = resolve_type(&native.type_name);
            debug!("column: {}, dataType: {}", native.name, semantic_type);

            let mut name = native.name.clone();
            let mut suffix = 0;
            while !seen.insert(name.clone()) {
                suffix += 1;
                name = format!("{}_{suffix}", native.name);
            }

            ResultColumn::new(name, semantic_type)
        })
        .collect()
}
