//! SQLite engine implementation.
//!
//! The host is a dedicated current-thread tokio runtime and the database is
//! a single sqlx `SqliteConnection` driven through `block_on`, so every call
//! completes on the caller's thread.
//!
//! Linked tables are listed in the `deskdb_links` catalog inside the file.
//! Refreshing one attaches its source database under a `link_<n>` schema and
//! exposes the source table through a temp view named after the link. Links
//! to the same source file share one attached schema, which is detached once
//! no temp view reads from it.

use super::{Cursor, Database, Engine, FieldDescriptor, FieldType, Host, TableDef, Value};
use crate::error::{DeskError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column as SqlxColumn, ConnectOptions, Connection, Row as SqlxRow, TypeInfo, ValueRef};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

/// Name of the catalog table that lists linked tables.
pub const LINK_CATALOG: &str = "deskdb_links";

/// Prefix of the schema a link's source database is attached under.
const LINK_SCHEMA_PREFIX: &str = "link_";

/// Default time to wait on a locked database file.
const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;

/// Timestamp formats accepted for text-stored dates.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Options for the SQLite engine.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    /// How long to wait for a locked database before giving up.
    pub busy_timeout: Duration,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS),
        }
    }
}

/// Embedded SQLite engine.
#[derive(Debug, Clone, Default)]
pub struct SqliteEngine {
    options: SqliteOptions,
}

impl SqliteEngine {
    pub fn new(options: SqliteOptions) -> Self {
        Self { options }
    }
}

impl Engine for SqliteEngine {
    fn launch(&self) -> Result<Box<dyn Host>> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DeskError::open_failure(format!("Failed to start engine runtime: {e}")))?;

        debug!("SQLite host started");
        Ok(Box::new(SqliteHost {
            runtime: Some(Arc::new(runtime)),
            options: self.options.clone(),
        }))
    }
}

struct SqliteHost {
    runtime: Option<Arc<Runtime>>,
    options: SqliteOptions,
}

impl Host for SqliteHost {
    fn open_database(&mut self, path: &Path) -> Result<Box<dyn Database>> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| DeskError::open_failure("SQLite host has quit"))?;

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false)
            .busy_timeout(self.options.busy_timeout);

        let conn = runtime
            .block_on(async {
                let mut conn = options.connect().await?;
                // Fails with "file is not a database" for foreign formats.
                sqlx::query_scalar::<_, i64>("SELECT count(*) FROM sqlite_master")
                    .fetch_one(&mut conn)
                    .await?;
                Ok::<_, sqlx::Error>(conn)
            })
            .map_err(|e| {
                DeskError::open_failure(format!("Cannot open {}: {}", path.display(), describe(&e)))
            })?;

        debug!("Opened SQLite database {}", path.display());
        Ok(Box::new(SqliteDatabase {
            runtime: Arc::clone(runtime),
            conn: Some(conn),
            path: path.to_path_buf(),
        }))
    }

    fn quit(&mut self) -> Result<()> {
        if self.runtime.take().is_some() {
            debug!("SQLite host stopped");
        }
        Ok(())
    }
}

struct SqliteDatabase {
    runtime: Arc<Runtime>,
    conn: Option<SqliteConnection>,
    path: PathBuf,
}

impl SqliteDatabase {
    fn parts(&mut self) -> Result<(&Runtime, &mut SqliteConnection)> {
        match self.conn.as_mut() {
            Some(conn) => Ok((self.runtime.as_ref(), conn)),
            None => Err(DeskError::engine(format!(
                "database {} is closed",
                self.path.display()
            ))),
        }
    }

    /// Resolves a link's source path; relative paths are taken from the
    /// directory of the open database.
    fn resolve_source(&self, source: &Path) -> PathBuf {
        if source.is_absolute() {
            return source.to_path_buf();
        }
        self.path
            .parent()
            .map_or_else(|| source.to_path_buf(), |dir| dir.join(source))
    }
}

impl Database for SqliteDatabase {
    fn table_defs(&mut self) -> Result<Vec<TableDef>> {
        let (runtime, conn) = self.parts()?;

        runtime
            .block_on(async {
                let names: Vec<String> = sqlx::query_scalar(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )
                .fetch_all(&mut *conn)
                .await?;

                let has_catalog = names.iter().any(|name| name == LINK_CATALOG);
                let mut defs: Vec<TableDef> = names
                    .into_iter()
                    .map(|name| {
                        if is_system_table(&name) {
                            TableDef::system(name)
                        } else {
                            TableDef::local(name)
                        }
                    })
                    .collect();

                if has_catalog {
                    let links: Vec<(String, Option<String>)> = sqlx::query_as(&format!(
                        "SELECT name, connect FROM {} ORDER BY name",
                        quote_ident(LINK_CATALOG)
                    ))
                    .fetch_all(&mut *conn)
                    .await?;
                    defs.extend(
                        links
                            .into_iter()
                            .map(|(name, connect)| TableDef::linked(name, connect.unwrap_or_default())),
                    );
                }

                Ok::<_, sqlx::Error>(defs)
            })
            .map_err(|e| DeskError::engine(format!("Failed to enumerate tables: {}", describe(&e))))
    }

    fn refresh_link(&mut self, table: &TableDef) -> Result<()> {
        let target = LinkTarget::parse(&table.name, &table.connect)?;
        let source = self.resolve_source(&target.database);
        let (runtime, conn) = self.parts()?;

        runtime.block_on(async {
            let result = relink(conn, table, &target.table, &source).await;
            if let Err(e) = detach_unused(conn).await {
                warn!("Failed to detach unused link sources: {}", describe(&e));
            }
            result
        })
    }

    fn open_cursor(&mut self, sql: &str) -> Result<Box<dyn Cursor + '_>> {
        let (runtime, conn) = self.parts()?;
        let rows = runtime
            .block_on(sqlx::query(sql).fetch_all(&mut *conn))
            .map_err(|e| DeskError::engine(describe(&e)))?;

        debug!("Snapshot cursor opened with {} records", rows.len());
        Ok(Box::new(SnapshotCursor::new(rows)?))
    }

    /// Runs the text in one transaction, so a failing statement leaves
    /// nothing from the earlier statements behind.
    fn execute(&mut self, sql: &str) -> Result<u64> {
        let (runtime, conn) = self.parts()?;
        runtime
            .block_on(async {
                let mut tx = conn.begin().await?;
                match sqlx::query(sql).execute(&mut *tx).await {
                    Ok(done) => {
                        tx.commit().await?;
                        Ok(done.rows_affected())
                    }
                    Err(e) => {
                        if let Err(rollback) = tx.rollback().await {
                            warn!("Rollback failed: {}", describe(&rollback));
                        }
                        Err(e)
                    }
                }
            })
            .map_err(|e: sqlx::Error| DeskError::engine(describe(&e)))
    }

    fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        self.runtime
            .block_on(conn.close())
            .map_err(|e| DeskError::internal(format!("Failed to close database: {}", describe(&e))))
    }
}

/// Rebuilds the temp view for one link over the schema its source file is
/// attached under, attaching the file first when no schema holds it yet.
async fn relink(
    conn: &mut SqliteConnection,
    table: &TableDef,
    source_table: &str,
    source: &Path,
) -> Result<()> {
    let view = quote_ident(&table.name);
    let link_err = |e: sqlx::Error| link_error(table, &e);

    sqlx::query(&format!("DROP VIEW IF EXISTS temp.{view}"))
        .execute(&mut *conn)
        .await
        .map_err(link_err)?;

    if !source.is_file() {
        return Err(DeskError::link_refresh(format!(
            "{}: source database {} not found",
            table.name,
            source.display()
        )));
    }

    let attached = attached_links(conn).await.map_err(link_err)?;
    let wanted = fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
    let existing = attached.iter().find(|(_, file)| {
        file.as_deref()
            .filter(|file| !file.is_empty())
            .and_then(|file| fs::canonicalize(file).ok())
            .is_some_and(|file| file == wanted)
    });

    let schema = match existing {
        Some((schema, _)) => schema.clone(),
        None => {
            let schema = (0..)
                .map(|n| format!("{LINK_SCHEMA_PREFIX}{n}"))
                .find(|name| attached.iter().all(|(attached, _)| attached != name))
                .unwrap_or_default();
            sqlx::query(&format!("ATTACH DATABASE ? AS {}", quote_ident(&schema)))
                .bind(source.to_string_lossy().into_owned())
                .execute(&mut *conn)
                .await
                .map_err(link_err)?;
            debug!("Attached {} as {}", source.display(), schema);
            schema
        }
    };

    sqlx::query(&format!(
        "CREATE TEMP VIEW {view} AS SELECT * FROM {}.{}",
        quote_ident(&schema),
        quote_ident(source_table)
    ))
    .execute(&mut *conn)
    .await
    .map_err(link_err)?;

    let check = sqlx::query(&format!("SELECT * FROM temp.{view} LIMIT 0"))
        .fetch_all(&mut *conn)
        .await;
    if let Err(e) = check {
        // Leave no half-built link behind.
        let _ = sqlx::query(&format!("DROP VIEW IF EXISTS temp.{view}"))
            .execute(&mut *conn)
            .await;
        return Err(link_err(e));
    }

    Ok(())
}

/// Attached link schemas with the file each one holds.
async fn attached_links(
    conn: &mut SqliteConnection,
) -> std::result::Result<Vec<(String, Option<String>)>, sqlx::Error> {
    let attached: Vec<(String, Option<String>)> =
        sqlx::query_as("SELECT name, file FROM pragma_database_list")
            .fetch_all(&mut *conn)
            .await?;
    Ok(attached
        .into_iter()
        .filter(|(name, _)| name.starts_with(LINK_SCHEMA_PREFIX))
        .collect())
}

/// Detaches every link schema that no temp view reads from.
async fn detach_unused(conn: &mut SqliteConnection) -> std::result::Result<(), sqlx::Error> {
    let views: Vec<Option<String>> =
        sqlx::query_scalar("SELECT sql FROM sqlite_temp_master WHERE type = 'view'")
            .fetch_all(&mut *conn)
            .await?;

    for (schema, _) in attached_links(conn).await? {
        let qualifier = format!("{}.", quote_ident(&schema));
        let in_use = views
            .iter()
            .flatten()
            .any(|sql| sql.contains(&qualifier));
        if !in_use {
            sqlx::query(&format!("DETACH DATABASE {}", quote_ident(&schema)))
                .execute(&mut *conn)
                .await?;
            debug!("Detached {}", schema);
        }
    }
    Ok(())
}

/// A parsed `;DATABASE=<path>[;TABLE=<name>]` connect string.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LinkTarget {
    database: PathBuf,
    table: String,
}

impl LinkTarget {
    fn parse(link_name: &str, connect: &str) -> Result<Self> {
        let mut database = None;
        let mut table = None;

        for part in connect.split(';') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim().to_uppercase().as_str() {
                "DATABASE" => database = Some(PathBuf::from(value)),
                "TABLE" => table = Some(value.to_string()),
                _ => {}
            }
        }

        let database = database.ok_or_else(|| {
            DeskError::link_refresh(format!(
                "{link_name}: connect string has no DATABASE entry"
            ))
        })?;

        Ok(Self {
            database,
            table: table.unwrap_or_else(|| link_name.to_string()),
        })
    }
}

/// Read-only snapshot of a row-producing statement, walked forward only.
struct SnapshotCursor {
    rows: Vec<SqliteRow>,
    fields: Vec<FieldDescriptor>,
    position: usize,
    closed: bool,
}

impl SnapshotCursor {
    fn new(rows: Vec<SqliteRow>) -> Result<Self> {
        let fields = describe_fields(&rows)?;
        Ok(Self {
            rows,
            fields,
            position: 0,
            closed: false,
        })
    }

    fn current(&self) -> Result<&SqliteRow> {
        if self.closed {
            return Err(DeskError::field_read("cursor is closed"));
        }
        self.rows
            .get(self.position)
            .ok_or_else(|| DeskError::field_read("no current record"))
    }
}

impl Cursor for SnapshotCursor {
    fn fields(&self) -> Result<Vec<FieldDescriptor>> {
        Ok(self.fields.clone())
    }

    fn bof(&self) -> bool {
        self.rows.is_empty()
    }

    fn eof(&self) -> bool {
        self.closed || self.position >= self.rows.len()
    }

    fn move_first(&mut self) -> Result<()> {
        if self.position != 0 {
            return Err(DeskError::engine("forward-only cursor cannot move back"));
        }
        Ok(())
    }

    fn move_next(&mut self) -> Result<()> {
        if self.eof() {
            return Err(DeskError::engine("no current record"));
        }
        self.position += 1;
        Ok(())
    }

    fn value(&self, index: usize) -> Result<Value> {
        let row = self.current()?;
        let field = self
            .fields
            .get(index)
            .ok_or_else(|| DeskError::field_read(format!("no field at index {index}")))?;

        match read_storage(row, index, field)? {
            Some(storage) => convert(field, storage),
            None => Ok(Value::Null),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.rows.clear();
        Ok(())
    }
}

/// Builds field descriptors from the declared column types.
///
/// Columns without a usable declared type (expressions) take the storage
/// class of their first non-null value.
fn describe_fields(rows: &[SqliteRow]) -> Result<Vec<FieldDescriptor>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };

    first
        .columns()
        .iter()
        .map(|column| {
            let declared = column.type_info();
            let field_type = if declared.is_null() {
                FieldType::Unknown(0)
            } else {
                field_type_for(declared.name())
            };
            let field_type = match field_type {
                FieldType::Unknown(_) => field_type_for(&runtime_type_name(rows, column.ordinal())?),
                known => known,
            };
            Ok(FieldDescriptor::new(column.name(), field_type))
        })
        .collect()
}

fn runtime_type_name(rows: &[SqliteRow], index: usize) -> Result<String> {
    for row in rows {
        let raw = row
            .try_get_raw(index)
            .map_err(|e| DeskError::field_read(format!("column {index}: {e}")))?;
        if !raw.is_null() {
            return Ok(raw.type_info().name().to_string());
        }
    }
    Ok("NULL".to_string())
}

/// Maps a SQLite type name to the native field type.
///
/// Names outside the known list follow SQLite's column affinity rules, so
/// `VARCHAR(20)` is text and `SMALLINT` is an integer. Names with numeric
/// affinity stay unknown and are typed from the stored values instead.
fn field_type_for(type_name: &str) -> FieldType {
    let upper = type_name.trim().to_uppercase();
    match upper.as_str() {
        "BOOLEAN" | "BOOL" => FieldType::Boolean,
        "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" => FieldType::BigInt,
        "REAL" | "FLOAT" | "DOUBLE" => FieldType::Double,
        "NUMERIC" | "DECIMAL" => FieldType::Decimal,
        "DATE" | "DATETIME" | "TIMESTAMP" => FieldType::Date,
        "TIME" => FieldType::Time,
        "TEXT" => FieldType::Text,
        "BLOB" => FieldType::LongBinary,
        _ if upper.contains("INT") => FieldType::BigInt,
        _ if ["CHAR", "CLOB", "TEXT"].iter().any(|s| upper.contains(s)) => FieldType::Text,
        _ if upper.contains("BLOB") => FieldType::LongBinary,
        _ if ["REAL", "FLOA", "DOUB"].iter().any(|s| upper.contains(s)) => FieldType::Double,
        _ => FieldType::Unknown(0),
    }
}

/// A non-null value in its SQLite storage class.
#[derive(Debug)]
enum Storage {
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

fn read_storage(row: &SqliteRow, index: usize, field: &FieldDescriptor) -> Result<Option<Storage>> {
    let read_error = |e: sqlx::Error| DeskError::field_read(format!("{}: {e}", field.name));

    let raw = row.try_get_raw(index).map_err(read_error)?;
    if raw.is_null() {
        return Ok(None);
    }
    let class = raw.type_info().name().to_string();

    let storage = match class.as_str() {
        "INTEGER" | "BOOLEAN" => Storage::Integer(row.try_get_unchecked(index).map_err(read_error)?),
        "REAL" => Storage::Real(row.try_get_unchecked(index).map_err(read_error)?),
        "BLOB" => Storage::Blob(row.try_get_unchecked(index).map_err(read_error)?),
        _ => Storage::Text(row.try_get_unchecked(index).map_err(read_error)?),
    };
    Ok(Some(storage))
}

/// Converts a stored value to the field's native type, falling back to the
/// storage class when the stored value does not fit the declared type.
fn convert(field: &FieldDescriptor, storage: Storage) -> Result<Value> {
    let value = match (field.field_type, storage) {
        (FieldType::Boolean, Storage::Integer(v)) => Value::Bool(v != 0),
        (FieldType::Decimal, Storage::Integer(v)) => Value::Decimal(Decimal::from(v)),
        (FieldType::Decimal, Storage::Real(v)) => {
            Decimal::try_from(v).map_or(Value::Double(v), Value::Decimal)
        }
        (FieldType::Decimal, Storage::Text(s)) => match Decimal::from_str(s.trim()) {
            Ok(d) => Value::Decimal(d),
            Err(_) => Value::Text(s),
        },
        (FieldType::Date, Storage::Integer(v)) => DateTime::from_timestamp(v, 0)
            .map_or(Value::Int64(v), |ts| Value::Timestamp(ts.naive_utc())),
        (FieldType::Date, Storage::Text(s)) => parse_timestamp(&s).map_or(Value::Text(s), Value::Timestamp),
        (FieldType::Time, Storage::Text(s)) => parse_time(&s).map_or(Value::Text(s), Value::Timestamp),
        (_, Storage::Integer(v)) => Value::Int64(v),
        (_, Storage::Real(v)) => Value::Double(v),
        (_, Storage::Text(s)) => Value::Text(s),
        (_, Storage::Blob(bytes)) => Value::Bytes(bytes),
    };
    Ok(value)
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Time-only values sit on the desktop-engine epoch, 1899-12-30.
fn parse_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    let time = TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())?;
    NaiveDate::from_ymd_opt(1899, 12, 30).map(|epoch| epoch.and_time(time))
}

fn is_system_table(name: &str) -> bool {
    name.to_lowercase().starts_with("sqlite_") || name == LINK_CATALOG
}

/// Quotes a SQLite identifier, doubling embedded quotes.
fn quote_ident(id: &str) -> String {
    format!("\"{}\"", id.replace('"', "\"\""))
}

fn link_error(table: &TableDef, error: &sqlx::Error) -> DeskError {
    DeskError::link_refresh(format!("{}: {}", table.name, describe(error)))
}

/// Formats a sqlx error, preferring the engine's own message.
fn describe(error: &sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}
