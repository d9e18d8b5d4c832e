//! Long-lived session tests.

use super::{driver, people_db};
use deskdb::{DeskError, ExecutionOutcome, Value};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn test_session_runs_multiple_statements() {
    let dir = TempDir::new().unwrap();
    let path = people_db(&dir);
    let driver = driver();
    let mut session = driver.open(&path).unwrap();

    assert_eq!(session.path(), path.as_path());
    assert_eq!(
        session
            .run("INSERT INTO People (id, name) VALUES (3, 'Barbara')")
            .unwrap(),
        ExecutionOutcome::Affected(1)
    );
    assert_eq!(session.run("DELETE FROM People WHERE id < 3").unwrap().rows_affected(), 2);

    let table = session.query("SELECT name FROM People").unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.get(0, "name"), Some(&Value::from("Barbara")));
}

#[test]
fn test_closed_session_is_not_open() {
    let dir = TempDir::new().unwrap();
    let path = people_db(&dir);
    let driver = driver();
    let mut session = driver.open(&path).unwrap();

    session.close();
    session.close();

    assert!(!session.is_open());
    assert!(matches!(
        session.query("SELECT * FROM People").unwrap_err(),
        DeskError::NotOpen(_)
    ));
    assert!(matches!(
        session.execute("DELETE FROM People").unwrap_err(),
        DeskError::NotOpen(_)
    ));
}

#[test]
fn test_independent_sessions_on_same_file() {
    let dir = TempDir::new().unwrap();
    let path = people_db(&dir);
    let driver = driver();

    let mut first = driver.open(&path).unwrap();
    let mut second = driver.open(&path).unwrap();

    first.execute("UPDATE People SET name = 'Ada L' WHERE id = 1").unwrap();
    first.close();

    let table = second.query("SELECT name FROM People WHERE id = 1").unwrap();
    assert_eq!(table.get(0, "name"), Some(&Value::from("Ada L")));
}

#[test]
fn test_comment_only_statement_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = people_db(&dir);
    let driver = driver();
    let mut session = driver.open(&path).unwrap();

    let err = session.run("-- SELECT * FROM People").unwrap_err();
    assert!(matches!(err, DeskError::InvalidArgument(_)));
    assert!(session.is_open());
}
