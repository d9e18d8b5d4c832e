//! Linked table refresh tests.

use super::{driver, empty_db, seed};
use deskdb::db::LINK_CATALOG;
use deskdb::Value;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::TempDir;

/// Builds a front-end database linking to `customers` in a second file,
/// plus one link whose source file does not exist.
fn linked_pair(dir: &TempDir) -> PathBuf {
    let remote = empty_db(dir, "remote.db");
    seed(
        &remote,
        &[
            "CREATE TABLE customers (id INTEGER, name TEXT)",
            "INSERT INTO customers VALUES (7, 'Grace'), (8, 'Edsger')",
        ],
    );

    let front = empty_db(dir, "front.db");
    seed(
        &front,
        &[
            &format!("CREATE TABLE {LINK_CATALOG} (name TEXT PRIMARY KEY, connect TEXT NOT NULL)"),
            &format!(
                "INSERT INTO {LINK_CATALOG} VALUES \
                 ('Customers', ';DATABASE={};TABLE=customers'), \
                 ('Archive', ';DATABASE=//offline/share/archive.db'), \
                 ('Notes', '  ')",
                remote.display()
            ),
            "CREATE TABLE Orders (id INTEGER, customer_id INTEGER)",
            "INSERT INTO Orders VALUES (100, 7)",
        ],
    );
    front
}

#[test]
fn test_refresh_skips_system_tables_and_survives_broken_link() {
    let dir = TempDir::new().unwrap();
    let path = linked_pair(&dir);
    let driver = driver();

    let mut session = driver.open(&path).unwrap();
    let summary = session.refresh_links().unwrap();

    assert_eq!(summary.refreshed, vec!["Customers"]);
    assert!(summary.skipped.iter().any(|name| name == LINK_CATALOG));
    assert!(summary.skipped.iter().any(|name| name == "Notes"));
    assert!(summary.skipped.iter().any(|name| name == "Orders"));
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].table, "Archive");
    assert!(!summary.is_clean());
}

#[test]
fn test_linked_table_is_queryable() {
    let dir = TempDir::new().unwrap();
    let path = linked_pair(&dir);

    let outcome = driver()
        .run_one_shot(
            &path,
            "SELECT o.id, c.name FROM Orders o JOIN Customers c ON c.id = o.customer_id",
        )
        .unwrap();
    let table = outcome.table().unwrap();

    assert_eq!(table.column_names(), vec!["id", "name"]);
    assert_eq!(table.get(0, "name"), Some(&Value::from("Grace")));
}

#[test]
fn test_mutation_through_one_shot_refreshes_links() {
    let dir = TempDir::new().unwrap();
    let path = linked_pair(&dir);

    let outcome = driver()
        .run_one_shot(&path, "INSERT INTO Orders VALUES (101, 8)")
        .unwrap();
    assert_eq!(outcome.rows_affected(), 1);

    let outcome = driver()
        .run_one_shot(&path, "SELECT count(*) AS n FROM Customers")
        .unwrap();
    assert_eq!(outcome.table().unwrap().get(0, "n"), Some(&Value::Int64(2)));
}

#[test]
fn test_many_links_to_one_backend_all_refresh() {
    let dir = TempDir::new().unwrap();
    let backend = empty_db(&dir, "backend.db");
    seed(
        &backend,
        &[
            "CREATE TABLE items (id INTEGER, label TEXT)",
            "INSERT INTO items VALUES (1, 'bolt')",
        ],
    );

    let front = empty_db(&dir, "front.db");
    let mut statements =
        vec![format!("CREATE TABLE {LINK_CATALOG} (name TEXT PRIMARY KEY, connect TEXT NOT NULL)")];
    statements.extend((0..12).map(|n| {
        format!("INSERT INTO {LINK_CATALOG} VALUES ('L{n}', ';DATABASE=backend.db;TABLE=items')")
    }));
    let statements: Vec<&str> = statements.iter().map(String::as_str).collect();
    seed(&front, &statements);

    let driver = driver();
    let mut session = driver.open(&front).unwrap();
    let summary = session.refresh_links().unwrap();

    assert_eq!(summary.refreshed.len(), 12);
    assert!(summary.failures.is_empty());

    let outcome = session.run("SELECT label FROM L0 UNION ALL SELECT label FROM L11").unwrap();
    let table = outcome.table().unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.get(1, "label"), Some(&Value::from("bolt")));
}
