//! Mock database connection for testing.
//!
//! Plays back a scripted result set and can be told to fail at any step of
//! statement execution.

use super::{Connection, NativeColumn, RawCell, RowCursor, Statement};
use crate::error::{FramesError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Counts the statements and cursors that are still alive.
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    statements: Arc<AtomicUsize>,
    cursors: Arc<AtomicUsize>,
}

impl ResourceTracker {
    /// Number of statements not yet released.
    pub fn open_statements(&self) -> usize {
        self.statements.load(Ordering::SeqCst)
    }

    /// Number of cursors not yet released.
    pub fn open_cursors(&self) -> usize {
        self.cursors.load(Ordering::SeqCst)
    }

    fn acquire(counter: &Arc<AtomicUsize>) -> Release {
        counter.fetch_add(1, Ordering::SeqCst);
        Release(Arc::clone(counter))
    }
}

/// Decrements its counter when dropped.
#[derive(Debug)]
struct Release(Arc<AtomicUsize>);

impl Drop for Release {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default)]
struct Script {
    columns: Vec<NativeColumn>,
    rows: Vec<Vec<RawCell>>,
    prepare_error: Option<FramesError>,
    execute_error: Option<FramesError>,
    columns_error: Option<FramesError>,
    scan_error: Option<(usize, FramesError)>,
    cursor_error: Option<FramesError>,
}

/// A mock connection that returns a predefined result set.
#[derive(Debug)]
pub struct MockConnection {
    connected: AtomicBool,
    script: Script,
    tracker: ResourceTracker,
    prepared: Mutex<Vec<String>>,
}

impl MockConnection {
    /// Creates a connected mock with no columns and no rows.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            script: Script::default(),
            tracker: ResourceTracker::default(),
            prepared: Mutex::new(Vec::new()),
        }
    }

    /// Adds a result column with the given native type name.
    pub fn with_column(mut self, name: &str, type_name: &str) -> Self {
        self.script.columns.push(NativeColumn::new(name, type_name));
        self
    }

    /// Adds a row of raw cells; `None` is SQL NULL.
    pub fn with_row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<[u8]>,
    {
        let row = cells
            .into_iter()
            .map(|cell| cell.map(|c| c.as_ref().to_vec()))
            .collect();
        self.script.rows.push(row);
        self
    }

    /// Marks the connection as not usable.
    pub fn disconnected(self) -> Self {
        self.connected.store(false, Ordering::SeqCst);
        self
    }

    /// Fails statement preparation.
    pub fn fail_prepare(mut self, error: FramesError) -> Self {
        self.script.prepare_error = Some(error);
        self
    }

    /// Fails statement execution.
    pub fn fail_execute(mut self, error: FramesError) -> Self {
        self.script.execute_error = Some(error);
        self
    }

    /// Fails column enumeration.
    pub fn fail_columns(mut self, error: FramesError) -> Self {
        self.script.columns_error = Some(error);
        self
    }

    /// Fails scanning of the row at `row` (zero-based).
    pub fn fail_scan_at(mut self, row: usize, error: FramesError) -> Self {
        self.script.scan_error = Some((row, error));
        self
    }

    /// Ends the row stream with the given error after all rows were delivered.
    pub fn fail_cursor(mut self, error: FramesError) -> Self {
        self.script.cursor_error = Some(error);
        self
    }

    /// Returns a handle observing this connection's statements and cursors.
    pub fn tracker(&self) -> ResourceTracker {
        self.tracker.clone()
    }

    /// Returns the SQL text of every prepare call, in order.
    pub fn prepared_sql(&self) -> Vec<String> {
        self.prepared
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>> {
        match self.prepared.lock() {
            Ok(mut prepared) => prepared.push(sql.to_string()),
            Err(e) => e.into_inner().push(sql.to_string()),
        }

        if let Some(error) = &self.script.prepare_error {
            return Err(error.clone());
        }

        Ok(Box::new(MockStatement {
            script: self.script.clone(),
            tracker: self.tracker.clone(),
            _release: ResourceTracker::acquire(&self.tracker.statements),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

struct MockStatement {
    script: Script,
    tracker: ResourceTracker,
    _release: Release,
}

#[async_trait]
impl Statement for MockStatement {
    async fn query(&mut self) -> Result<Box<dyn RowCursor>> {
        if let Some(error) = &self.script.execute_error {
            return Err(error.clone());
        }

        Ok(Box::new(MockCursor {
            script: self.script.clone(),
            position: 0,
            current: None,
            _release: ResourceTracker::acquire(&self.tracker.cursors),
        }))
    }
}

struct MockCursor {
    script: Script,
    position: usize,
    current: Option<usize>,
    _release: Release,
}

#[async_trait]
impl RowCursor for MockCursor {
    fn columns(&self) -> Result<Vec<NativeColumn>> {
        match &self.script.columns_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.script.columns.clone()),
        }
    }

    async fn advance(&mut self) -> bool {
        if self.position < self.script.rows.len() {
            self.current = Some(self.position);
            self.position += 1;
            true
        } else {
            self.current = None;
            false
        }
    }

    fn scan(&mut self, dest: &mut [RawCell]) -> Result<()> {
        let index = self
            .current
            .ok_or_else(|| FramesError::row_scan("scan called without a current row"))?;

        if let Some((row, error)) = &self.script.scan_error {
            if *row == index {
                return Err(error.clone());
            }
        }

        let row = &self.script.rows[index];
        if row.len() != dest.len() {
            return Err(FramesError::row_scan(format!(
                "expected {} destination buffers, got {}",
                row.len(),
                dest.len()
            )));
        }

        dest.clone_from_slice(row);
        Ok(())
    }

    fn err(&mut self) -> Option<FramesError> {
        self.script.cursor_error.take()
    }
}
