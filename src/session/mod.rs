//! Session lifecycle for one open database file.
//!
//! A session owns a host instance and the database it opened. Both handles
//! are acquired together on open and released together on close, database
//! first, so a session is never half-open.

mod links;

pub use links::{refresh_linked_tables, LinkFailure, RefreshSummary};

use crate::db::{Cursor, Database, Engine, Host, TabularResult};
use crate::error::{DeskError, Result};
use crate::query::{materialize, ExecutionOutcome};
use crate::statement::{classify, leading_statement, StatementKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The live handle pair of an open session.
struct ActiveSession {
    host: Box<dyn Host>,
    database: Box<dyn Database>,
}

/// An open database file.
///
/// Not safe for concurrent use; callers serialize operations on one session.
pub struct Session {
    path: PathBuf,
    active: Option<ActiveSession>,
}

impl Session {
    /// Launches a host, opens `path` in it and refreshes linked tables.
    ///
    /// If the file cannot be opened the host is shut down before returning.
    pub fn open(engine: &dyn Engine, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut host = engine.launch()?;

        let database = match host.open_database(path) {
            Ok(database) => database,
            Err(e) => {
                if let Err(quit_err) = host.quit() {
                    warn!("Failed to stop host after open failure: {}", quit_err);
                }
                return Err(match e {
                    DeskError::OpenFailure(_) => e,
                    other => DeskError::open_failure(other.to_string()),
                });
            }
        };

        let mut session = Self {
            path: path.to_path_buf(),
            active: Some(ActiveSession { host, database }),
        };
        info!("Opened session for {}", session.path.display());

        session.refresh_links()?;
        Ok(session)
    }

    /// The database file this session was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True until the session is closed.
    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Runs a row-producing statement and materializes its records.
    ///
    /// The cursor is released on every path.
    pub fn query(&mut self, sql: &str) -> Result<TabularResult> {
        let database = self.database()?;
        require_sql(sql)?;

        debug!("Opening cursor: {}", sql);
        let mut cursor = CursorGuard(database.open_cursor(sql)?);
        materialize(cursor.0.as_mut())
    }

    /// Runs a mutating statement and returns the rows affected.
    ///
    /// Any row-level failure fails the whole call.
    pub fn execute(&mut self, sql: &str) -> Result<u64> {
        let database = self.database()?;
        require_sql(sql)?;

        debug!("Executing: {}", sql);
        database.execute(sql)
    }

    /// Classifies `sql` and dispatches it to [`query`](Self::query) or
    /// [`execute`](Self::execute).
    ///
    /// Blank and comment-only text is rejected.
    pub fn run(&mut self, sql: &str) -> Result<ExecutionOutcome> {
        if !self.is_open() {
            return Err(not_open(&self.path));
        }
        let sql = sql.trim();
        require_statement(sql)?;

        let kind = classify(sql);
        info!("Running {} statement", kind);
        match kind {
            StatementKind::RowProducing => self.query(sql).map(ExecutionOutcome::Rows),
            StatementKind::Mutating => self.execute(sql).map(ExecutionOutcome::Affected),
        }
    }

    /// Re-establishes linked tables; individual failures land in the summary.
    pub fn refresh_links(&mut self) -> Result<RefreshSummary> {
        let database = self.database()?;
        let summary = refresh_linked_tables(database);
        debug!(
            "Link refresh: {} refreshed, {} skipped, {} failed",
            summary.refreshed.len(),
            summary.skipped.len(),
            summary.failures.len()
        );
        Ok(summary)
    }

    /// Releases the database and then the host.
    ///
    /// Release failures are logged, never returned. Calling this again is a no-op.
    pub fn close(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        if let Err(e) = active.database.close() {
            warn!("Failed to close database {}: {}", self.path.display(), e);
        }
        if let Err(e) = active.host.quit() {
            warn!("Failed to stop host for {}: {}", self.path.display(), e);
        }
        info!("Closed session for {}", self.path.display());
    }

    fn database(&mut self) -> Result<&mut dyn Database> {
        match self.active.as_mut() {
            Some(active) => Ok(active.database.as_mut()),
            None => Err(not_open(&self.path)),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Closes the wrapped cursor when dropped.
struct CursorGuard<'a>(Box<dyn Cursor + 'a>);

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.0.close() {
            warn!("Failed to release cursor: {}", e);
        }
    }
}

fn not_open(path: &Path) -> DeskError {
    DeskError::not_open(format!("session for {} is closed", path.display()))
}

fn require_sql(sql: &str) -> Result<()> {
    if sql.trim().is_empty() {
        return Err(DeskError::invalid_argument("SQL statement is blank"));
    }
    Ok(())
}

/// Rejects text with no statement after leading comments.
pub(crate) fn require_statement(sql: &str) -> Result<()> {
    match leading_statement(sql) {
        Some(body) if !body.is_empty() => Ok(()),
        _ if sql.trim().is_empty() => Err(DeskError::invalid_argument("SQL statement is blank")),
        _ => Err(DeskError::invalid_argument("SQL text contains only comments")),
    }
}
