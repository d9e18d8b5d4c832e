//! Best-effort refresh of externally linked tables.

use crate::db::Database;
use serde::Serialize;
use tracing::{debug, warn};

/// A linked table whose refresh failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkFailure {
    pub table: String,
    pub reason: String,
}

/// What one refresh pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// Links re-established successfully.
    pub refreshed: Vec<String>,
    /// System tables and tables without a connect string.
    pub skipped: Vec<String>,
    /// Links that could not be re-established.
    pub failures: Vec<LinkFailure>,
}

impl RefreshSummary {
    /// Returns true if every eligible link was refreshed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Re-establishes every eligible linked table in `database`.
///
/// Never fails: enumeration and per-table errors are logged and recorded
/// in the summary.
pub fn refresh_linked_tables(database: &mut dyn Database) -> RefreshSummary {
    let mut summary = RefreshSummary::default();

    let tables = match database.table_defs() {
        Ok(tables) => tables,
        Err(e) => {
            warn!("Could not enumerate tables for link refresh: {}", e);
            return summary;
        }
    };

    for table in tables {
        if !table.is_refreshable() {
            summary.skipped.push(table.name);
            continue;
        }

        match database.refresh_link(&table) {
            Ok(()) => {
                debug!("Refreshed link {}", table.name);
                summary.refreshed.push(table.name);
            }
            Err(e) => {
                warn!("Failed to refresh link {}: {}", table.name, e);
                summary.failures.push(LinkFailure {
                    table: table.name,
                    reason: e.to_string(),
                });
            }
        }
    }

    summary
}
