//! Cursor materialization.
//!
//! Drains a forward-only cursor into a [`TabularResult`] with unique column
//! names and one semantic type per column.

use crate::db::{Column, Cursor, FieldDescriptor, Row, TabularResult, Value};
use crate::error::Result;
use std::collections::HashSet;
use tracing::debug;

/// Reads every record of `cursor` into a new table.
///
/// An empty cursor yields a table with no columns and no rows. Field
/// metadata failures propagate; an empty large-binary field reads as null.
pub fn materialize(cursor: &mut dyn Cursor) -> Result<TabularResult> {
    if cursor.bof() && cursor.eof() {
        return Ok(TabularResult::empty());
    }

    let fields = cursor.fields()?;
    let mut taken = HashSet::with_capacity(fields.len());
    let columns = fields
        .iter()
        .enumerate()
        .map(|(ordinal, field)| {
            let candidate = if field.name.is_empty() {
                format!("Column{ordinal}")
            } else {
                field.name.clone()
            };
            let name = unique_column_name(&candidate, &mut taken);
            Column::new(name, field.field_type.column_type())
        })
        .collect();

    let mut table = TabularResult::with_columns(columns);

    cursor.move_first()?;
    while !cursor.eof() {
        let row = read_row(cursor, &fields)?;
        table.push_row(row)?;
        cursor.move_next()?;
    }

    debug!(
        "Materialized {} rows x {} columns",
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

fn read_row(cursor: &dyn Cursor, fields: &[FieldDescriptor]) -> Result<Row> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| match cursor.value(index) {
            Ok(value) => Ok(normalize(field, value)),
            Err(e) if e.is_empty_binary_read() => Ok(Value::Null),
            Err(e) => Err(e),
        })
        .collect()
}

/// Surfaces binary payloads the engine wrapped as opaque values as bytes.
fn normalize(field: &FieldDescriptor, value: Value) -> Value {
    match value {
        Value::Opaque(opaque) if field.field_type.is_binary() => match opaque.raw {
            Some(raw) => Value::Bytes(raw),
            None => Value::Opaque(opaque),
        },
        other => other,
    }
}

/// Reserves a column name, suffixing `_1`, `_2`, ... until one is free.
///
/// Names compare case-insensitively.
pub fn unique_column_name(candidate: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(candidate.to_lowercase()) {
        return candidate.to_string();
    }

    let mut suffix = 1usize;
    loop {
        let name = format!("{candidate}_{suffix}");
        if taken.insert(name.to_lowercase()) {
            return name;
        }
        suffix += 1;
    }
}
