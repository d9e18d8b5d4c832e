//! Result materialization and statement outcomes.
//!
//! Turns native cursors into caller-owned [`TabularResult`]s and pairs them
//! with affected-row counts.

mod materializer;

pub use materializer::{materialize, unique_column_name};

use crate::db::TabularResult;
use serde::Serialize;

/// Outcome of running a single statement.
///
/// Either a table (with zero rows affected) or an affected-row count, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// A row-producing statement's materialized result.
    Rows(TabularResult),
    /// A mutating statement's engine-reported row count.
    Affected(u64),
}

impl ExecutionOutcome {
    /// Rows affected by the statement; always zero for a table.
    pub fn rows_affected(&self) -> u64 {
        match self {
            Self::Rows(_) => 0,
            Self::Affected(rows) => *rows,
        }
    }

    /// The materialized table, if the statement produced rows.
    pub fn table(&self) -> Option<&TabularResult> {
        match self {
            Self::Rows(table) => Some(table),
            Self::Affected(_) => None,
        }
    }

    /// Splits the outcome into the `(result, rows_affected)` pair.
    pub fn into_parts(self) -> (Option<TabularResult>, u64) {
        match self {
            Self::Rows(table) => (Some(table), 0),
            Self::Affected(rows) => (None, rows),
        }
    }
}
