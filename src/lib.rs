//! deskdb - a session driver for desktop database files.
//!
//! Opens a database file inside an engine host, keeps its linked tables in
//! sync, routes each SQL statement to a cursor or to execution, and returns
//! either a materialized [`TabularResult`] or an affected-row count.

pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod logging;
pub mod query;
pub mod session;
pub mod statement;

pub use db::{TabularResult, Value};
pub use driver::{Driver, DriverOptions};
pub use error::{DeskError, Result};
pub use query::ExecutionOutcome;
pub use session::{RefreshSummary, Session};
pub use statement::{classify, StatementKind};
