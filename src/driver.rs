//! Driver entry points.
//!
//! [`Driver::run_one_shot`] opens a session, runs one statement and tears the
//! session down. [`Driver::open`] hands out a [`Session`] the caller keeps
//! open across statements.

use crate::db::{engine_for, Engine, EngineKind, SqliteOptions};
use crate::error::{DeskError, Result};
use crate::query::ExecutionOutcome;
use crate::session::{require_statement, Session};
use crate::statement::{classify, StatementKind};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Options for the driver.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Refresh linked tables again after a one-shot mutating statement.
    pub refresh_links_after_execute: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            refresh_links_after_execute: true,
        }
    }
}

/// Runs SQL against database files through an engine.
pub struct Driver {
    engine: Box<dyn Engine>,
    options: DriverOptions,
}

impl Driver {
    /// Creates a driver over `engine`.
    pub fn new(engine: Box<dyn Engine>, options: DriverOptions) -> Self {
        Self { engine, options }
    }

    /// Creates a driver for a built-in backend.
    pub fn for_kind(kind: EngineKind, engine_options: SqliteOptions, options: DriverOptions) -> Self {
        Self::new(engine_for(kind, engine_options), options)
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Opens a long-lived session on `path`.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Session> {
        let path = path.as_ref();
        require_existing_file(path)?;
        Session::open(self.engine.as_ref(), path)
    }

    /// Opens `path`, runs `sql` and closes the session.
    ///
    /// Argument errors are raised before anything is acquired. The session
    /// is closed on every path, and a close problem never replaces the
    /// statement's own error.
    pub fn run_one_shot(&self, path: impl AsRef<Path>, sql: &str) -> Result<ExecutionOutcome> {
        let path = path.as_ref();
        require_existing_file(path)?;
        let sql = sql.trim();
        require_statement(sql)?;

        let start = Instant::now();
        let mut session = Session::open(self.engine.as_ref(), path)?;

        let kind = classify(sql);
        info!("Running {} statement against {}", kind, path.display());
        let outcome = match kind {
            StatementKind::RowProducing => session.query(sql).map(ExecutionOutcome::Rows),
            StatementKind::Mutating => session.execute(sql).map(ExecutionOutcome::Affected),
        };

        if outcome.is_ok() && !kind.is_row_producing() && self.options.refresh_links_after_execute
        {
            session.refresh_links()?;
        }

        session.close();
        debug!("One-shot run finished in {:?}", start.elapsed());
        outcome
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn require_existing_file(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(DeskError::invalid_argument("database path is blank"));
    }
    if !path.is_file() {
        return Err(DeskError::invalid_argument(format!(
            "database file {} does not exist",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FieldType, MockEngine, MockResultSet, TableDef, Value};
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    const PEOPLE: &str = "SELECT id, name FROM People";
    const RENAME: &str = "UPDATE People SET name='X' WHERE id=1";

    fn engine() -> MockEngine {
        MockEngine::new()
            .with_result_set(
                PEOPLE,
                MockResultSet::new()
                    .field("id", FieldType::Long)
                    .field("name", FieldType::Text)
                    .row([Value::Int32(1), Value::from("Ada")])
                    .row([Value::Int32(2), Value::from("Grace")]),
            )
            .with_rows_affected(RENAME, 1)
            .with_failing_statement("DELETE FROM Locked", "record is locked")
            .with_table(TableDef::linked("Orders", ";DATABASE=orders.accdb"))
    }

    fn driver(engine: &MockEngine, options: DriverOptions) -> Driver {
        Driver::new(Box::new(engine.clone()), options)
    }

    #[test]
    fn test_missing_file_acquires_nothing() {
        let engine = engine();
        let err = driver(&engine, DriverOptions::default())
            .run_one_shot("/no/such/file.accdb", PEOPLE)
            .unwrap_err();

        assert!(matches!(err, DeskError::InvalidArgument(_)));
        assert!(engine.journal().is_empty());
    }

    #[test]
    fn test_comment_only_sql_acquires_nothing() {
        let file = NamedTempFile::new().unwrap();
        let engine = engine();
        let driver = driver(&engine, DriverOptions::default());

        for sql in ["", "   ", "-- only a comment", "/* note */"] {
            let err = driver.run_one_shot(file.path(), sql).unwrap_err();
            assert!(matches!(err, DeskError::InvalidArgument(_)), "{sql:?}");
        }
        assert!(engine.journal().is_empty());
    }

    #[test]
    fn test_query_returns_table() {
        let file = NamedTempFile::new().unwrap();
        let engine = engine();

        let outcome = driver(&engine, DriverOptions::default())
            .run_one_shot(file.path(), PEOPLE)
            .unwrap();
        let (table, affected) = outcome.into_parts();
        let table = table.unwrap();

        assert_eq!(affected, 0);
        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(engine.count("refresh "), 1);
        assert_eq!(engine.count("database.close"), 1);
        assert_eq!(engine.count("host.quit"), 1);
    }

    #[test]
    fn test_mutation_refreshes_links_again() {
        let file = NamedTempFile::new().unwrap();
        let engine = engine();

        let outcome = driver(&engine, DriverOptions::default())
            .run_one_shot(file.path(), RENAME)
            .unwrap();

        assert_eq!(outcome.into_parts(), (None, 1));
        assert_eq!(engine.count("refresh "), 2);
    }

    #[test]
    fn test_post_execute_refresh_can_be_disabled() {
        let file = NamedTempFile::new().unwrap();
        let engine = engine();
        let options = DriverOptions {
            refresh_links_after_execute: false,
        };

        driver(&engine, options).run_one_shot(file.path(), RENAME).unwrap();
        assert_eq!(engine.count("refresh "), 1);
    }

    #[test]
    fn test_engine_error_wins_over_close_error() {
        let file = NamedTempFile::new().unwrap();
        let engine = engine().failing_close("handle gone").failing_quit("host gone");

        let err = driver(&engine, DriverOptions::default())
            .run_one_shot(file.path(), "DELETE FROM Locked")
            .unwrap_err();

        assert!(matches!(err, DeskError::EngineFailure(_)));
        assert!(err.to_string().contains("record is locked"));
        assert_eq!(engine.count("database.close"), 1);
        assert_eq!(engine.count("host.quit"), 1);
    }

    #[test]
    fn test_open_failure_propagates() {
        let file = NamedTempFile::new().unwrap();
        let engine = engine().failing_open("unrecognized database format");

        let err = driver(&engine, DriverOptions::default())
            .run_one_shot(file.path(), PEOPLE)
            .unwrap_err();
        assert!(matches!(err, DeskError::OpenFailure(_)));
    }

    #[test]
    fn test_open_returns_live_session() {
        let file = NamedTempFile::new().unwrap();
        let engine = engine();
        let driver = driver(&engine, DriverOptions::default());

        let mut session = driver.open(file.path()).unwrap();
        assert_eq!(session.run(PEOPLE).unwrap().rows_affected(), 0);
        assert_eq!(session.run(RENAME).unwrap().rows_affected(), 1);
        assert_eq!(engine.count("launch"), 1);
        drop(session);
        assert_eq!(engine.count("host.quit"), 1);

        assert!(matches!(
            driver.open("/no/such/file.accdb").unwrap_err(),
            DeskError::InvalidArgument(_)
        ));
    }
}
