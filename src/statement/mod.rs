//! Statement classification module.
//!
//! Decides whether a SQL string should be opened as a read-only cursor
//! or executed as a mutating statement. This is advisory routing only:
//! no SQL syntax is parsed or validated here.

mod classifier;

pub use classifier::{classify, leading_statement, ROW_PRODUCING_KEYWORD};

use std::fmt;

/// How a statement is dispatched to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Produces rows; opened as a read-only, forward-only cursor.
    RowProducing,
    /// Mutates data; executed for an affected-row count.
    Mutating,
}

impl StatementKind {
    /// Returns true if the statement is expected to produce rows.
    pub fn is_row_producing(&self) -> bool {
        matches!(self, Self::RowProducing)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowProducing => write!(f, "row-producing"),
            Self::Mutating => write!(f, "mutating"),
        }
    }
}
