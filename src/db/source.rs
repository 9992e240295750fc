use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use crate::config::EngineConfig;
use crate::error::AppError;
use crate::parser::columns::ColumnMap;
use crate::parser::pipeline::load_rows;
use crate::parser::types::LoadOutput;

/// Opens an orders database read-only. The engine never writes to its source.
pub fn open_source(path: &str) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    conn.execute_batch(
        "
        PRAGMA cache_size = -64000;
        PRAGMA busy_timeout = 5000;
        PRAGMA temp_store = MEMORY;
        PRAGMA mmap_size = 268435456;
    ",
    )?;

    log::info!("Opened orders database {}", path);
    Ok(conn)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn cell_to_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    }
}

/// Loads every row of `table` through the same normalization as a CSV file.
/// Cells of any storage class are read as text first; NULL reads as empty.
pub fn load_orders(
    conn: &Connection,
    table: &str,
    config: &EngineConfig,
) -> Result<LoadOutput, AppError> {
    if !is_identifier(table) {
        return Err(AppError::Configuration(format!(
            "invalid table name {:?}",
            table
        )));
    }

    let mut stmt = conn.prepare(&format!("SELECT * FROM \"{}\"", table))?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let col_map = ColumnMap::from_names(&names);
    let column_count = names.len();

    let rows = stmt.query_map([], |row| {
        (0..column_count)
            .map(|i| row.get_ref(i).map(cell_to_string))
            .collect::<Result<Vec<String>, _>>()
    })?;
    let records = rows.map(|r| r.map(csv::StringRecord::from).map_err(|e| e.to_string()));

    load_rows(&col_map, records, 0, config, |rows, accepted| {
        log::debug!("{} rows read, {} orders accepted", rows, accepted)
    })
}
