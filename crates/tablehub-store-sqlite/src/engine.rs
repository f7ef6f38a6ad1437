// crates/tablehub-store-sqlite/src/engine.rs
// ============================================================================
// Module: SQLite Table Engine
// Description: Read-only query execution against uploaded database files.
// Purpose: Answer full-dump and projection queries over stored SQLite files.
// Dependencies: tablehub-core, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Uploaded databases are untrusted. Each query copies the object bytes into
//! a scoped scratch file, opens it read-only, and runs a single statement
//! built from validated identifiers. Identifiers are double-quoted with
//! embedded quotes doubled; filter values and row caps are always bound as
//! parameters and never spliced into SQL text.
//!
//! Projected and filtered columns are checked against the table's column
//! list before execution. `SQLite` treats an unknown double-quoted name as a
//! string literal, so an unchecked column would silently match nothing.
//!
//! The scratch file lives exactly as long as its connection and is removed
//! on every exit path when dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use rusqlite::types::ValueRef;
use tablehub_core::Cell;
use tablehub_core::CellValue;
use tablehub_core::EngineError;
use tablehub_core::ObjectHandle;
use tablehub_core::QueryShape;
use tablehub_core::QuerySpec;
use tablehub_core::Row;
use tablehub_core::RowSet;
use tablehub_core::TableEngine;
use tablehub_core::TableName;
use tempfile::NamedTempFile;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Offset of the file-format write version byte in the database header.
const HEADER_WRITE_VERSION_OFFSET: usize = 18;
/// Offset of the file-format read version byte in the database header.
const HEADER_READ_VERSION_OFFSET: usize = 19;
/// Header format version marking a WAL-mode database.
const HEADER_FORMAT_WAL: u8 = 2;
/// Header format version marking a rollback-journal database.
const HEADER_FORMAT_LEGACY: u8 = 1;

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Table engine over uploaded `SQLite` files.
#[derive(Debug, Clone, Default)]
pub struct SqliteTableEngine {
    /// Directory for scratch files; the system temp directory when unset.
    scratch_dir: Option<PathBuf>,
}

impl SqliteTableEngine {
    /// Creates an engine using the system temp directory for scratch files.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            scratch_dir: None,
        }
    }

    /// Creates an engine placing scratch files under `dir`.
    #[must_use]
    pub fn with_scratch_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: Some(dir.into()),
        }
    }

    /// Copies bytes into a scratch file and opens it read-only.
    fn open_scratch(&self, bytes: &[u8]) -> Result<ScratchDatabase, EngineError> {
        let mut file = match &self.scratch_dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(|err| EngineError::Io(err.to_string()))?;
        if is_wal_header(bytes) {
            // Read as a rollback-journal file; the copy has no -wal sidecar.
            let mut patched = bytes.to_vec();
            patched[HEADER_WRITE_VERSION_OFFSET] = HEADER_FORMAT_LEGACY;
            patched[HEADER_READ_VERSION_OFFSET] = HEADER_FORMAT_LEGACY;
            file.write_all(&patched).map_err(|err| EngineError::Io(err.to_string()))?;
        } else {
            file.write_all(bytes).map_err(|err| EngineError::Io(err.to_string()))?;
        }
        file.flush().map_err(|err| EngineError::Io(err.to_string()))?;
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(file.path(), flags)
            .map_err(|err| EngineError::NotADatabase(err.to_string()))?;
        connection
            .execute_batch("PRAGMA query_only = 1;")
            .map_err(|err| EngineError::NotADatabase(err.to_string()))?;
        Ok(ScratchDatabase {
            connection,
            _file: file,
        })
    }

    /// Opens a handle and resolves the target table.
    fn prepare(
        &self,
        handle: &ObjectHandle,
        table: Option<&TableName>,
    ) -> Result<(ScratchDatabase, Vec<String>, String), EngineError> {
        let scratch = self.open_scratch(handle.bytes())?;
        let tables = list_tables(&scratch.connection)?;
        let selected = select_table(&tables, table)?;
        Ok((scratch, tables, selected))
    }
}

impl TableEngine for SqliteTableEngine {
    fn inspect(&self, bytes: &[u8]) -> Result<Vec<String>, EngineError> {
        let scratch = self.open_scratch(bytes)?;
        list_tables(&scratch.connection)
    }

    fn execute(&self, handle: &ObjectHandle, spec: &QuerySpec) -> Result<RowSet, EngineError> {
        let (scratch, tables, table) = self.prepare(handle, spec.table.as_ref())?;
        let connection = &scratch.connection;
        let available = column_names(connection, &table)?;
        let mut bindings = vec![Value::Integer(i64::from(spec.effective_row_cap()))];
        let sql = match &spec.shape {
            QueryShape::FullDump => format!("SELECT * FROM {} LIMIT ?1", quote_identifier(&table)),
            QueryShape::Projection {
                x,
                y,
                filter,
            } => {
                require_column(&available, x.as_str())?;
                require_column(&available, y.as_str())?;
                let mut sql = format!(
                    "SELECT {}, {} FROM {}",
                    quote_identifier(x.as_str()),
                    quote_identifier(y.as_str()),
                    quote_identifier(&table)
                );
                if let Some(filter) = filter {
                    require_column(&available, filter.column.as_str())?;
                    sql.push_str(&format!(
                        " WHERE {} {} ?2",
                        quote_identifier(filter.column.as_str()),
                        filter.operator.as_sql()
                    ));
                    bindings.push(Value::Text(filter.value.clone()));
                }
                sql.push_str(" LIMIT ?1");
                sql
            }
        };
        let (columns, rows) = read_rows(connection, &sql, bindings)?;
        let total_rows = count_rows(connection, &table)?;
        Ok(build_row_set(table, tables, columns, rows, total_rows))
    }

    fn export(
        &self,
        handle: &ObjectHandle,
        table: Option<&TableName>,
    ) -> Result<RowSet, EngineError> {
        let (scratch, tables, table) = self.prepare(handle, table)?;
        let sql = format!("SELECT * FROM {}", quote_identifier(&table));
        let (columns, rows) = read_rows(&scratch.connection, &sql, Vec::new())?;
        let total_rows = count_rows(&scratch.connection, &table)?;
        Ok(build_row_set(table, tables, columns, rows, total_rows))
    }
}

// ============================================================================
// SECTION: Scratch Files
// ============================================================================

/// Read-only connection over a scratch copy of an object.
struct ScratchDatabase {
    /// Read-only connection; declared first so it closes before the file is removed.
    connection: Connection,
    /// Scratch file removed on drop.
    _file: NamedTempFile,
}

/// Returns true when the header declares WAL mode.
fn is_wal_header(bytes: &[u8]) -> bool {
    bytes.len() > HEADER_READ_VERSION_OFFSET
        && bytes[HEADER_WRITE_VERSION_OFFSET] == HEADER_FORMAT_WAL
        && bytes[HEADER_READ_VERSION_OFFSET] == HEADER_FORMAT_WAL
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Lists user tables sorted by name.
fn list_tables(connection: &Connection) -> Result<Vec<String>, EngineError> {
    let mut stmt = connection
        .prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .map_err(|err| EngineError::NotADatabase(err.to_string()))?;
    let tables = stmt
        .query_map(params![], |row| row.get::<_, String>(0))
        .map_err(|err| EngineError::NotADatabase(err.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| EngineError::NotADatabase(err.to_string()))?;
    Ok(tables)
}

/// Picks the requested table, or the first table when none is requested.
fn select_table(tables: &[String], requested: Option<&TableName>) -> Result<String, EngineError> {
    let Some(first) = tables.first() else {
        return Err(EngineError::NoTables);
    };
    match requested {
        None => Ok(first.clone()),
        Some(table) => tables
            .iter()
            .find(|name| name.as_str() == table.as_str())
            .cloned()
            .ok_or_else(|| EngineError::TableNotFound(table.to_string())),
    }
}

/// Returns the column names of a table in declaration order.
fn column_names(connection: &Connection, table: &str) -> Result<Vec<String>, EngineError> {
    let stmt = connection
        .prepare(&format!("SELECT * FROM {} LIMIT 0", quote_identifier(table)))
        .map_err(|err| EngineError::Query(err.to_string()))?;
    Ok(stmt.column_names().into_iter().map(str::to_string).collect())
}

/// Fails when a column is not part of the table.
fn require_column(available: &[String], column: &str) -> Result<(), EngineError> {
    if available.iter().any(|name| name == column) {
        Ok(())
    } else {
        Err(EngineError::ColumnNotFound(column.to_string()))
    }
}

/// Counts every row of a table.
fn count_rows(connection: &Connection, table: &str) -> Result<u64, EngineError> {
    let count: i64 = connection
        .query_row(&format!("SELECT COUNT(*) FROM {}", quote_identifier(table)), params![], |row| {
            row.get(0)
        })
        .map_err(|err| EngineError::Query(err.to_string()))?;
    u64::try_from(count).map_err(|_| EngineError::Query(format!("invalid row count: {count}")))
}

/// Runs a statement and collects named rows.
fn read_rows(
    connection: &Connection,
    sql: &str,
    bindings: Vec<Value>,
) -> Result<(Vec<String>, Vec<Row>), EngineError> {
    let mut stmt = connection.prepare(sql).map_err(|err| EngineError::Query(err.to_string()))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let mut rows = stmt
        .query(params_from_iter(bindings))
        .map_err(|err| EngineError::Query(err.to_string()))?;
    let mut collected = Vec::new();
    while let Some(row) = rows.next().map_err(|err| EngineError::Query(err.to_string()))? {
        let mut cells = Vec::with_capacity(columns.len());
        for (index, name) in columns.iter().enumerate() {
            let value = row.get_ref(index).map_err(|err| EngineError::Query(err.to_string()))?;
            cells.push(Cell {
                name: name.clone(),
                value: cell_value(value),
            });
        }
        collected.push(Row(cells));
    }
    Ok((columns, collected))
}

/// Converts a borrowed engine value into an owned cell value.
fn cell_value(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(value) => CellValue::Integer(value),
        ValueRef::Real(value) => CellValue::Real(value),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => CellValue::Blob(bytes.to_vec()),
    }
}

/// Assembles a row set.
fn build_row_set(
    table: String,
    tables: Vec<String>,
    columns: Vec<String>,
    rows: Vec<Row>,
    total_rows: u64,
) -> RowSet {
    RowSet {
        table,
        tables,
        columns,
        row_count: u64::try_from(rows.len()).unwrap_or(u64::MAX),
        rows,
        total_rows,
    }
}

/// Double-quotes an identifier, doubling embedded quotes.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
