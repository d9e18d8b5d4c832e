//! End-to-end tests against temporary SQLite files.

pub mod links_test;
pub mod one_shot_test;
pub mod session_test;

use deskdb::db::SqliteEngine;
use deskdb::{Driver, DriverOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates an empty database file (SQLite accepts a zero-length file).
pub fn empty_db(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, b"").unwrap();
    path
}

pub fn driver() -> Driver {
    Driver::new(Box::new(SqliteEngine::default()), DriverOptions::default())
}

/// Runs setup statements through a short-lived session.
pub fn seed(path: &Path, statements: &[&str]) {
    let driver = driver();
    let mut session = driver.open(path).unwrap();
    for sql in statements {
        session.execute(sql).unwrap();
    }
    session.close();
}

/// A database with a two-row `People` table.
pub fn people_db(dir: &TempDir) -> PathBuf {
    let path = empty_db(dir, "people.db");
    seed(
        &path,
        &[
            "CREATE TABLE People (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            "INSERT INTO People (id, name) VALUES (1, 'Ada'), (2, 'Grace')",
        ],
    );
    path
}
