//! One-shot driver tests.

use super::{driver, empty_db, people_db, seed};
use deskdb::db::{ColumnType, MockEngine};
use deskdb::{DeskError, Driver, DriverOptions, Value};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn test_select_returns_table() {
    let dir = TempDir::new().unwrap();
    let path = people_db(&dir);

    let outcome = driver()
        .run_one_shot(&path, "SELECT id, name FROM People")
        .unwrap();
    let (table, rows_affected) = outcome.into_parts();
    let table = table.unwrap();

    assert_eq!(rows_affected, 0);
    assert_eq!(table.column_names(), vec!["id", "name"]);
    assert_eq!(table.columns()[0].column_type, ColumnType::Int64);
    assert_eq!(table.columns()[1].column_type, ColumnType::Text);
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.get(0, "name"), Some(&Value::from("Ada")));
    assert_eq!(table.get(1, "id"), Some(&Value::Int64(2)));
}

#[test]
fn test_update_returns_rows_affected() {
    let dir = TempDir::new().unwrap();
    let path = people_db(&dir);

    let outcome = driver()
        .run_one_shot(&path, "UPDATE People SET name='X' WHERE id=1")
        .unwrap();
    assert_eq!(outcome.into_parts(), (None, 1));

    let table = driver()
        .run_one_shot(&path, "select name from People where id = 1")
        .unwrap()
        .into_parts()
        .0
        .unwrap();
    assert_eq!(table.get(0, "name"), Some(&Value::from("X")));
}

#[test]
fn test_comment_prefixed_select() {
    let dir = TempDir::new().unwrap();
    let path = people_db(&dir);

    let outcome = driver()
        .run_one_shot(&path, "-- who\n  /* note */  select count(*) AS n FROM People")
        .unwrap();
    let table = outcome.table().unwrap();
    assert_eq!(table.get(0, "n"), Some(&Value::Int64(2)));
}

#[test]
fn test_duplicate_column_names() {
    let dir = TempDir::new().unwrap();
    let path = people_db(&dir);

    let outcome = driver()
        .run_one_shot(&path, "SELECT name AS X, name AS X, id AS x FROM People")
        .unwrap();
    assert_eq!(outcome.table().unwrap().column_names(), vec!["X", "X_1", "x_2"]);
}

#[test]
fn test_empty_select_has_no_columns() {
    let dir = TempDir::new().unwrap();
    let path = people_db(&dir);

    let outcome = driver()
        .run_one_shot(&path, "SELECT id, name FROM People WHERE id > 100")
        .unwrap();
    let table = outcome.table().unwrap();
    assert_eq!(table.column_count(), 0);
    assert_eq!(table.row_count(), 0);
}

#[test]
fn test_nonexistent_path_is_invalid_before_launch() {
    let engine = MockEngine::new();
    let driver = Driver::new(Box::new(engine.clone()), DriverOptions::default());

    let err = driver
        .run_one_shot("/definitely/not/here.db", "SELECT 1")
        .unwrap_err();
    assert!(matches!(err, DeskError::InvalidArgument(_)));
    assert!(engine.journal().is_empty());
}

#[test]
fn test_foreign_file_is_open_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "plain text, not a database ".repeat(200)).unwrap();

    let err = driver().run_one_shot(&path, "SELECT 1").unwrap_err();
    assert!(matches!(err, DeskError::OpenFailure(_)));
}

#[test]
fn test_constraint_violation_is_engine_failure() {
    let dir = TempDir::new().unwrap();
    let path = people_db(&dir);

    let err = driver()
        .run_one_shot(&path, "INSERT INTO People (id, name) VALUES (1, 'Dup')")
        .unwrap_err();
    assert!(matches!(err, DeskError::EngineFailure(_)));
    assert_eq!(err.category(), "Engine Failure");
}

#[test]
fn test_failed_batch_leaves_no_partial_writes() {
    let dir = TempDir::new().unwrap();
    let path = people_db(&dir);
    let driver = driver();

    let err = driver
        .run_one_shot(
            &path,
            "INSERT INTO People VALUES (3, 'C'); INSERT INTO People VALUES (1, 'dup')",
        )
        .unwrap_err();
    assert!(matches!(err, DeskError::EngineFailure(_)));

    let outcome = driver
        .run_one_shot(&path, "SELECT count(*) AS n FROM People")
        .unwrap();
    assert_eq!(outcome.table().unwrap().get(0, "n"), Some(&Value::Int64(2)));
}

#[test]
fn test_empty_blob_stays_distinct_from_null() {
    let dir = TempDir::new().unwrap();
    let path = empty_db(&dir, "files.db");
    seed(
        &path,
        &[
            "CREATE TABLE Files (id INTEGER, body BLOB)",
            "INSERT INTO Files VALUES (1, x'CAFE'), (2, x''), (3, NULL)",
        ],
    );

    let outcome = driver()
        .run_one_shot(&path, "SELECT id, body FROM Files ORDER BY id")
        .unwrap();
    let table = outcome.table().unwrap();

    assert_eq!(table.columns()[1].column_type, ColumnType::Bytes);
    assert_eq!(table.get(0, "body"), Some(&Value::Bytes(vec![0xCA, 0xFE])));
    assert_eq!(table.get(1, "body"), Some(&Value::Bytes(vec![])));
    assert_eq!(table.get(2, "body"), Some(&Value::Null));
}
