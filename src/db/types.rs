//! Result and metadata types for deskdb.
//!
//! Defines native field type codes, the semantic column types they map to,
//! the tagged value type, table definitions and the materialized result.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::error::{DeskError, Result};

/// Native declared field type, numbered like the classic desktop engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Boolean,
    Byte,
    Integer,
    Long,
    Currency,
    Single,
    Double,
    Date,
    Binary,
    Text,
    LongBinary,
    Memo,
    Guid,
    BigInt,
    VarBinary,
    Char,
    Numeric,
    Decimal,
    Float,
    Time,
    TimeStamp,
    /// A type code the driver does not recognize.
    Unknown(i16),
}

impl FieldType {
    /// Builds a field type from its native code.
    pub fn from_code(code: i16) -> Self {
        match code {
            1 => Self::Boolean,
            2 => Self::Byte,
            3 => Self::Integer,
            4 => Self::Long,
            5 => Self::Currency,
            6 => Self::Single,
            7 => Self::Double,
            8 => Self::Date,
            9 => Self::Binary,
            10 => Self::Text,
            11 => Self::LongBinary,
            12 => Self::Memo,
            15 => Self::Guid,
            16 => Self::BigInt,
            17 => Self::VarBinary,
            18 => Self::Char,
            19 => Self::Numeric,
            20 => Self::Decimal,
            21 => Self::Float,
            22 => Self::Time,
            23 => Self::TimeStamp,
            other => Self::Unknown(other),
        }
    }

    /// Returns the native code for this field type.
    pub fn code(&self) -> i16 {
        match self {
            Self::Boolean => 1,
            Self::Byte => 2,
            Self::Integer => 3,
            Self::Long => 4,
            Self::Currency => 5,
            Self::Single => 6,
            Self::Double => 7,
            Self::Date => 8,
            Self::Binary => 9,
            Self::Text => 10,
            Self::LongBinary => 11,
            Self::Memo => 12,
            Self::Guid => 15,
            Self::BigInt => 16,
            Self::VarBinary => 17,
            Self::Char => 18,
            Self::Numeric => 19,
            Self::Decimal => 20,
            Self::Float => 21,
            Self::Time => 22,
            Self::TimeStamp => 23,
            Self::Unknown(code) => *code,
        }
    }

    /// Returns true for binary, var-binary and long-binary fields.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary | Self::VarBinary | Self::LongBinary)
    }

    /// Maps the native type to the semantic column type.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Boolean => ColumnType::Boolean,
            Self::Byte => ColumnType::Byte,
            Self::Integer => ColumnType::Int16,
            Self::Long => ColumnType::Int32,
            Self::BigInt => ColumnType::Int64,
            Self::Currency | Self::Decimal | Self::Numeric => ColumnType::Decimal,
            Self::Single => ColumnType::Single,
            Self::Double | Self::Float => ColumnType::Double,
            Self::Date | Self::Time | Self::TimeStamp => ColumnType::Timestamp,
            Self::Text | Self::Memo | Self::Char => ColumnType::Text,
            Self::Binary | Self::VarBinary | Self::LongBinary => ColumnType::Bytes,
            Self::Guid | Self::Unknown(_) => ColumnType::Opaque,
        }
    }
}

/// Semantic type of a materialized column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Boolean,
    Byte,
    Int16,
    Int32,
    Int64,
    Decimal,
    Single,
    Double,
    Timestamp,
    Text,
    Bytes,
    Opaque,
}

impl ColumnType {
    /// Returns the type name used in rendered output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Decimal => "decimal",
            Self::Single => "single",
            Self::Double => "double",
            Self::Timestamp => "timestamp",
            Self::Text => "text",
            Self::Bytes => "bytes",
            Self::Opaque => "opaque",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name and declared type of one cursor field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// A native value the driver has no semantic type for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opaque {
    /// Engine-reported type name.
    pub type_name: String,
    /// Raw payload, when the engine exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Vec<u8>>,
}

/// A single value read from a result cursor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Distinguished null marker.
    #[default]
    Null,
    Bool(bool),
    Byte(u8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Decimal(Decimal),
    Single(f32),
    Double(f64),
    Timestamp(NaiveDateTime),
    Text(String),
    Bytes(Vec<u8>),
    Opaque(Opaque),
}

impl Value {
    /// Returns true if this value is the null marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as a string for display.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Byte(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Single(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Text(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
            Value::Opaque(o) => format!("<{}>", o.type_name),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Attribute flags of a table definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableAttributes {
    /// Internal/system object, never refreshed.
    pub system: bool,
}

/// A table definition inside the open database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub attributes: TableAttributes,
    /// Connection string; empty for local tables.
    pub connect: String,
}

impl TableDef {
    /// A local (non-linked) user table.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: TableAttributes::default(),
            connect: String::new(),
        }
    }

    /// A table linked to an external source.
    pub fn linked(name: impl Into<String>, connect: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: TableAttributes::default(),
            connect: connect.into(),
        }
    }

    /// An internal/system table.
    pub fn system(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: TableAttributes { system: true },
            connect: String::new(),
        }
    }

    /// Returns true if the link refresher should try to re-establish this table.
    pub fn is_refreshable(&self) -> bool {
        !self.attributes.system && !self.connect.trim().is_empty()
    }
}

/// A materialized column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A row of values aligned to the result's columns.
pub type Row = Vec<Value>;

/// Materialized, random-access result of a row-producing statement.
///
/// Every row holds exactly one value per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularResult {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl TabularResult {
    /// Creates a result with zero columns and zero rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a result with the given columns and no rows.
    pub fn with_columns(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, rejecting rows whose width differs from the column count.
    pub fn push_row(&mut self, row: Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(DeskError::internal(format!(
                "row has {} values but the result has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Finds a column by name, ignoring ASCII case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Returns the value at `row` in the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(index))
    }

    /// Consumes the result, returning its columns and rows.
    pub fn into_parts(self) -> (Vec<Column>, Vec<Row>) {
        (self.columns, self.rows)
    }
}
