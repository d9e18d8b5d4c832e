//! Mock engine for testing.
//!
//! Provides a scriptable in-memory engine. Every native call is written to
//! a shared journal so tests can check what was acquired and released, and
//! in which order.

use super::{Cursor, Database, Engine, FieldDescriptor, FieldType, Host, TableDef, Value};
use crate::error::{DeskError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One scripted cell of a mock result set.
#[derive(Debug, Clone)]
enum MockCell {
    Value(Value),
    EmptyBinary,
    ReadError(String),
}

/// A scripted result set returned for one SQL string.
#[derive(Debug, Clone, Default)]
pub struct MockResultSet {
    fields: Vec<FieldDescriptor>,
    rows: Vec<Vec<MockCell>>,
    field_error: Option<String>,
}

impl MockResultSet {
    /// Creates a result set with no fields and no records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field descriptor.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDescriptor::new(name, field_type));
        self
    }

    /// Adds a record.
    pub fn row(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.rows
            .push(values.into_iter().map(MockCell::Value).collect());
        self
    }

    /// Makes reading `(row, column)` fail the way an empty large-binary field does.
    pub fn empty_binary_at(mut self, row: usize, column: usize) -> Self {
        self.set_cell(row, column, MockCell::EmptyBinary);
        self
    }

    /// Makes reading `(row, column)` fail with an ordinary read error.
    pub fn read_error_at(mut self, row: usize, column: usize, message: impl Into<String>) -> Self {
        self.set_cell(row, column, MockCell::ReadError(message.into()));
        self
    }

    /// Makes reading the field metadata fail.
    pub fn failing_fields(mut self, message: impl Into<String>) -> Self {
        self.field_error = Some(message.into());
        self
    }

    fn set_cell(&mut self, row: usize, column: usize, cell: MockCell) {
        if let Some(slot) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *slot = cell;
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    journal: Vec<String>,
    result_sets: HashMap<String, MockResultSet>,
    statements: HashMap<String, std::result::Result<u64, String>>,
    tables: Vec<(TableDef, Option<String>)>,
    launch_error: Option<String>,
    open_error: Option<String>,
    table_defs_error: Option<String>,
    close_error: Option<String>,
    quit_error: Option<String>,
    cursor_close_error: Option<String>,
}

/// A scriptable in-memory engine.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    /// Creates a mock engine with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the result set returned for `sql`.
    pub fn with_result_set(self, sql: impl Into<String>, result_set: MockResultSet) -> Self {
        self.lock().result_sets.insert(sql.into(), result_set);
        self
    }

    /// Scripts the affected-row count returned for `sql`.
    pub fn with_rows_affected(self, sql: impl Into<String>, rows: u64) -> Self {
        self.lock().statements.insert(sql.into(), Ok(rows));
        self
    }

    /// Scripts an engine failure for executing `sql`.
    pub fn with_failing_statement(self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.lock().statements.insert(sql.into(), Err(message.into()));
        self
    }

    /// Adds a table definition whose link refresh succeeds.
    pub fn with_table(self, table: TableDef) -> Self {
        self.lock().tables.push((table, None));
        self
    }

    /// Adds a table definition whose link refresh fails with `message`.
    pub fn with_broken_link(self, table: TableDef, message: impl Into<String>) -> Self {
        self.lock().tables.push((table, Some(message.into())));
        self
    }

    /// Makes launching the host fail.
    pub fn failing_launch(self, message: impl Into<String>) -> Self {
        self.lock().launch_error = Some(message.into());
        self
    }

    /// Makes opening the database fail.
    pub fn failing_open(self, message: impl Into<String>) -> Self {
        self.lock().open_error = Some(message.into());
        self
    }

    /// Makes enumerating table definitions fail.
    pub fn failing_table_defs(self, message: impl Into<String>) -> Self {
        self.lock().table_defs_error = Some(message.into());
        self
    }

    /// Makes closing the database handle fail.
    pub fn failing_close(self, message: impl Into<String>) -> Self {
        self.lock().close_error = Some(message.into());
        self
    }

    /// Makes quitting the host fail.
    pub fn failing_quit(self, message: impl Into<String>) -> Self {
        self.lock().quit_error = Some(message.into());
        self
    }

    /// Makes releasing cursors fail.
    pub fn failing_cursor_close(self, message: impl Into<String>) -> Self {
        self.lock().cursor_close_error = Some(message.into());
        self
    }

    /// Returns every native call recorded so far.
    pub fn journal(&self) -> Vec<String> {
        self.lock().journal.clone()
    }

    /// Returns how many journal entries start with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.lock()
            .journal
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    /// Clears the journal.
    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record(state: &Mutex<MockState>, entry: impl Into<String>) {
    lock_state(state).journal.push(entry.into());
}

impl Engine for MockEngine {
    fn launch(&self) -> Result<Box<dyn Host>> {
        record(&self.state, "launch");
        if let Some(message) = self.lock().launch_error.clone() {
            return Err(DeskError::open_failure(message));
        }
        Ok(Box::new(MockHost {
            state: Arc::clone(&self.state),
            running: true,
        }))
    }
}

struct MockHost {
    state: Arc<Mutex<MockState>>,
    running: bool,
}

impl Host for MockHost {
    fn open_database(&mut self, path: &Path) -> Result<Box<dyn Database>> {
        record(&self.state, format!("open {}", path.display()));
        if !self.running {
            return Err(DeskError::open_failure("host has quit"));
        }
        if let Some(message) = lock_state(&self.state).open_error.clone() {
            return Err(DeskError::open_failure(message));
        }
        Ok(Box::new(MockDatabase {
            state: Arc::clone(&self.state),
            path: path.to_path_buf(),
            open: true,
        }))
    }

    fn quit(&mut self) -> Result<()> {
        record(&self.state, "host.quit");
        self.running = false;
        match lock_state(&self.state).quit_error.clone() {
            Some(message) => Err(DeskError::internal(message)),
            None => Ok(()),
        }
    }
}

struct MockDatabase {
    state: Arc<Mutex<MockState>>,
    path: PathBuf,
    open: bool,
}

impl MockDatabase {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(DeskError::engine(format!(
                "database {} is closed",
                self.path.display()
            )))
        }
    }
}

impl Database for MockDatabase {
    fn table_defs(&mut self) -> Result<Vec<TableDef>> {
        record(&self.state, "table_defs");
        self.ensure_open()?;
        let state = lock_state(&self.state);
        if let Some(message) = &state.table_defs_error {
            return Err(DeskError::engine(message.clone()));
        }
        Ok(state.tables.iter().map(|(table, _)| table.clone()).collect())
    }

    fn refresh_link(&mut self, table: &TableDef) -> Result<()> {
        record(&self.state, format!("refresh {}", table.name));
        self.ensure_open()?;
        let state = lock_state(&self.state);
        let failure = state
            .tables
            .iter()
            .find(|(def, _)| def.name == table.name)
            .and_then(|(_, failure)| failure.clone());
        match failure {
            Some(message) => Err(DeskError::link_refresh(message)),
            None => Ok(()),
        }
    }

    fn open_cursor(&mut self, sql: &str) -> Result<Box<dyn Cursor + '_>> {
        record(&self.state, format!("cursor.open {sql}"));
        self.ensure_open()?;
        let result_set = lock_state(&self.state)
            .result_sets
            .get(sql)
            .cloned()
            .ok_or_else(|| DeskError::engine(format!("no result set scripted for: {sql}")))?;
        Ok(Box::new(MockCursor {
            state: Arc::clone(&self.state),
            result_set,
            position: 0,
            closed: false,
        }))
    }

    fn execute(&mut self, sql: &str) -> Result<u64> {
        record(&self.state, format!("execute {sql}"));
        self.ensure_open()?;
        match lock_state(&self.state).statements.get(sql) {
            Some(Ok(rows)) => Ok(*rows),
            Some(Err(message)) => Err(DeskError::engine(message.clone())),
            None => Err(DeskError::engine(format!("no statement scripted for: {sql}"))),
        }
    }

    fn close(&mut self) -> Result<()> {
        record(&self.state, "database.close");
        self.open = false;
        match lock_state(&self.state).close_error.clone() {
            Some(message) => Err(DeskError::internal(message)),
            None => Ok(()),
        }
    }
}

struct MockCursor {
    state: Arc<Mutex<MockState>>,
    result_set: MockResultSet,
    position: usize,
    closed: bool,
}

impl Cursor for MockCursor {
    fn fields(&self) -> Result<Vec<FieldDescriptor>> {
        match &self.result_set.field_error {
            Some(message) => Err(DeskError::field_read(message.clone())),
            None => Ok(self.result_set.fields.clone()),
        }
    }

    fn bof(&self) -> bool {
        self.result_set.rows.is_empty()
    }

    fn eof(&self) -> bool {
        self.closed || self.position >= self.result_set.rows.len()
    }

    fn move_first(&mut self) -> Result<()> {
        if self.position != 0 {
            return Err(DeskError::engine("forward-only cursor cannot move back"));
        }
        Ok(())
    }

    fn move_next(&mut self) -> Result<()> {
        if self.eof() {
            return Err(DeskError::engine("no current record"));
        }
        self.position += 1;
        Ok(())
    }

    fn value(&self, index: usize) -> Result<Value> {
        if self.eof() {
            return Err(DeskError::field_read("no current record"));
        }
        let field = self
            .result_set
            .fields
            .get(index)
            .map_or_else(|| format!("#{index}"), |f| f.name.clone());
        match self.result_set.rows[self.position].get(index) {
            Some(MockCell::Value(value)) => Ok(value.clone()),
            Some(MockCell::EmptyBinary) => Err(DeskError::empty_binary(field)),
            Some(MockCell::ReadError(message)) => {
                Err(DeskError::field_read(format!("{field}: {message}")))
            }
            None => Ok(Value::Null),
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        record(&self.state, "cursor.close");
        match lock_state(&self.state).cursor_close_error.clone() {
            Some(message) => Err(DeskError::internal(message)),
            None => Ok(()),
        }
    }
}
