// src/parse/sqlite.rs

use rusqlite::{types::ValueRef, Connection, OpenFlags};
use std::path::Path;
use tracing::{info, instrument};

use crate::data::{Dataset, Value};
use crate::error::ParseError;

/// `SELECT * FROM <table>` into a dataset, column order as declared.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_sqlite_table(path: impl AsRef<Path>, table: &str) -> Result<Dataset, ParseError> {
    let err = |source| ParseError::Sqlite {
        table: table.to_string(),
        source,
    };

    let conn = Connection::open_with_flags(path.as_ref(), OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(err)?;
    let sql = format!("SELECT * FROM \"{}\"", table.replace('"', "\"\""));
    let mut stmt = conn.prepare(&sql).map_err(err)?;

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let mut ds = Dataset::new(columns);

    let mut rows = stmt.query([]).map_err(err)?;
    while let Some(row) = rows.next().map_err(err)? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(match row.get_ref(i).map_err(err)? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(n) => Value::Int(n),
                ValueRef::Real(x) => Value::Float(x),
                ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Blob(b) => Value::Text(format!("<{} bytes>", b.len())),
            });
        }
        ds.push_row(values);
    }

    info!(rows = ds.len(), columns = width, "loaded table");
    Ok(ds)
}
