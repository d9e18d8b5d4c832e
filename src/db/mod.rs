//! Engine abstraction layer for deskdb.
//!
//! The driver talks to a host application and the database it opened
//! through these traits, so the session logic never depends on a
//! particular engine. Every call is synchronous and blocking.

pub mod mock;
mod sqlite;
mod types;

pub use mock::{MockEngine, MockResultSet};
pub use sqlite::{SqliteEngine, SqliteOptions, LINK_CATALOG};
pub use types::{
    Column, ColumnType, FieldDescriptor, FieldType, Opaque, Row, TableAttributes, TableDef,
    TabularResult, Value,
};

use crate::error::Result;
use std::path::Path;

/// Supported engine backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Sqlite,
}

impl EngineKind {
    /// Returns the engine as a string for display and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses an engine kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Creates the engine for the given backend.
pub fn engine_for(kind: EngineKind, options: SqliteOptions) -> Box<dyn Engine> {
    match kind {
        EngineKind::Sqlite => Box::new(SqliteEngine::new(options)),
    }
}

/// Starts host application instances.
pub trait Engine: Send + Sync {
    /// Launches a new, independent host instance.
    fn launch(&self) -> Result<Box<dyn Host>>;
}

/// A running host application that can open one database file.
pub trait Host: Send {
    /// Opens the database file at `path`.
    fn open_database(&mut self, path: &Path) -> Result<Box<dyn Database>>;

    /// Shuts the host down without saving.
    fn quit(&mut self) -> Result<()>;
}

/// An open database inside a host.
pub trait Database: Send {
    /// Enumerates the table definitions, freshly on every call.
    fn table_defs(&mut self) -> Result<Vec<TableDef>>;

    /// Re-establishes the external link of one table.
    fn refresh_link(&mut self, table: &TableDef) -> Result<()>;

    /// Opens a read-only, forward-only cursor over a row-producing statement.
    fn open_cursor(&mut self, sql: &str) -> Result<Box<dyn Cursor + '_>>;

    /// Executes a statement, failing on any row-level error.
    ///
    /// Returns the engine-reported number of affected rows.
    fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Closes the database handle.
    fn close(&mut self) -> Result<()>;
}

/// A forward-only cursor over the records of a row-producing statement.
pub trait Cursor {
    /// Returns the ordered field descriptors.
    fn fields(&self) -> Result<Vec<FieldDescriptor>>;

    /// True when positioned before the first record.
    fn bof(&self) -> bool;

    /// True when positioned after the last record.
    fn eof(&self) -> bool;

    /// Positions the cursor on its first record.
    fn move_first(&mut self) -> Result<()>;

    /// Advances to the next record.
    fn move_next(&mut self) -> Result<()>;

    /// Reads the value of field `index` in the current record.
    fn value(&self, index: usize) -> Result<Value>;

    /// Releases the cursor. Safe to call more than once.
    fn close(&mut self) -> Result<()>;
}
