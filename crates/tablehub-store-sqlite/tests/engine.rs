// crates/tablehub-store-sqlite/tests/engine.rs
// ============================================================================
// Module: SQLite Table Engine Tests
// Description: Query-shape coverage against real SQLite files.
// Purpose: Ensure caps, filters, counts, and error classes hold.
// Dependencies: tablehub-store-sqlite, tablehub-core, rusqlite, tempfile
// ============================================================================
//! ## Overview
//! Builds small SQLite files on disk, loads their bytes into object handles,
//! and runs every supported query shape through the engine.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use rusqlite::Connection;
use tablehub_core::BucketName;
use tablehub_core::CellValue;
use tablehub_core::ColumnName;
use tablehub_core::EngineError;
use tablehub_core::FilterClause;
use tablehub_core::FilterOperator;
use tablehub_core::ObjectHandle;
use tablehub_core::ObjectId;
use tablehub_core::QuerySpec;
use tablehub_core::RowSet;
use tablehub_core::StorageLocator;
use tablehub_core::TableEngine;
use tablehub_core::TableName;
use tablehub_core::UserName;
use tablehub_store_sqlite::SqliteTableEngine;
use tempfile::TempDir;

fn database(sql: &str) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixture.db");
    {
        let connection = Connection::open(&path).unwrap();
        connection.execute_batch(sql).unwrap();
    }
    std::fs::read(&path).unwrap()
}

fn people() -> Vec<u8> {
    let mut sql = String::from(
        "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT, age INTEGER, photo BLOB);
         CREATE TABLE notes (body TEXT);",
    );
    for id in 1 ..= 30 {
        sql.push_str(&format!(
            "INSERT INTO people (id, name, age, photo) VALUES ({id}, 'person{id}', {}, NULL);",
            20 + id
        ));
    }
    sql.push_str("INSERT INTO people (id, name, age, photo) VALUES (31, 'it''s', NULL, x'0102');");
    database(&sql)
}

fn handle(bytes: Vec<u8>) -> ObjectHandle {
    let owner = UserName::parse("alice").unwrap();
    let locator =
        StorageLocator::new(BucketName::for_owner(&owner), ObjectId::parse("aaaaaaaa.db").unwrap());
    ObjectHandle::new(locator, bytes)
}

fn table(name: &str) -> Option<TableName> {
    Some(TableName::parse(name).unwrap())
}

fn column(name: &str) -> ColumnName {
    ColumnName::parse(name).unwrap()
}

fn filter(column_name: &str, operator: &str, value: &str) -> Option<FilterClause> {
    Some(FilterClause {
        column: column(column_name),
        operator: FilterOperator::parse(operator).unwrap(),
        value: value.to_string(),
    })
}

fn ids(rows: &RowSet) -> Vec<i64> {
    rows.rows
        .iter()
        .map(|row| match row.0[0].value {
            CellValue::Integer(value) => value,
            ref other => panic!("unexpected cell {other:?}"),
        })
        .collect()
}

#[test]
fn inspect_lists_tables_sorted() {
    let engine = SqliteTableEngine::new();
    assert_eq!(engine.inspect(&people()).unwrap(), vec!["notes", "people"]);
}

#[test]
fn inspect_rejects_non_database_bytes() {
    let engine = SqliteTableEngine::new();
    let err = engine.inspect(b"definitely not a database file, just some text").unwrap_err();
    assert!(matches!(err, EngineError::NotADatabase(_)));
}

#[test]
fn full_dump_keeps_native_order_and_caps_rows() {
    let engine = SqliteTableEngine::new();
    let rows = engine.execute(&handle(people()), &QuerySpec::full_dump(table("people"), None)).unwrap();
    assert_eq!(ids(&rows), (1 ..= 10).collect::<Vec<_>>());
    assert_eq!(rows.row_count, 10);
    assert_eq!(rows.total_rows, 31);
    assert_eq!(rows.columns, vec!["id", "name", "age", "photo"]);
    assert_eq!(rows.tables, vec!["notes", "people"]);
}

#[test]
fn first_table_is_used_when_none_is_named() {
    let engine = SqliteTableEngine::new();
    let rows = engine.execute(&handle(people()), &QuerySpec::full_dump(None, Some(5))).unwrap();
    assert_eq!(rows.table, "notes");
    assert!(rows.rows.is_empty());
    assert_eq!(rows.total_rows, 0);
}

#[test]
fn projection_filters_with_bound_values() {
    let engine = SqliteTableEngine::new();
    let spec =
        QuerySpec::projection(table("people"), column("id"), column("age"), filter("age", ">=", "45"));
    let rows = engine.execute(&handle(people()), &spec).unwrap();
    assert_eq!(ids(&rows), (25 ..= 30).collect::<Vec<_>>());
    assert_eq!(rows.columns, vec!["id", "age"]);
    assert_eq!(rows.total_rows, 31);

    let spec =
        QuerySpec::projection(table("people"), column("id"), column("name"), filter("name", "like", "person1%"));
    let rows = engine.execute(&handle(people()), &spec).unwrap();
    assert_eq!(ids(&rows), vec![1, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19]);
}

#[test]
fn injection_text_is_treated_as_a_literal() {
    let engine = SqliteTableEngine::new();
    let spec = QuerySpec::projection(
        table("people"),
        column("id"),
        column("name"),
        filter("name", "=", "' OR 1=1 --"),
    );
    let rows = engine.execute(&handle(people()), &spec).unwrap();
    assert!(rows.rows.is_empty());
    assert_eq!(rows.total_rows, 31);
    let body = String::from_utf8(rows.to_json_bytes().unwrap()).unwrap();
    assert!(body.contains("\"rows\":[]"));

    let spec =
        QuerySpec::projection(table("people"), column("id"), column("name"), filter("name", "=", "it's"));
    let rows = engine.execute(&handle(people()), &spec).unwrap();
    assert_eq!(ids(&rows), vec![31]);
}

#[test]
fn missing_tables_and_columns_are_errors() {
    let engine = SqliteTableEngine::new();
    let err = engine
        .execute(&handle(people()), &QuerySpec::full_dump(table("ghosts"), None))
        .unwrap_err();
    assert_eq!(err, EngineError::TableNotFound("ghosts".to_string()));

    let spec = QuerySpec::projection(table("people"), column("id"), column("height"), None);
    let err = engine.execute(&handle(people()), &spec).unwrap_err();
    assert_eq!(err, EngineError::ColumnNotFound("height".to_string()));

    let spec =
        QuerySpec::projection(table("people"), column("id"), column("age"), filter("weight", "<", "3"));
    let err = engine.execute(&handle(people()), &spec).unwrap_err();
    assert_eq!(err, EngineError::ColumnNotFound("weight".to_string()));
}

#[test]
fn databases_without_tables_are_rejected() {
    let engine = SqliteTableEngine::new();
    let bytes = database("CREATE VIEW \"nothing\" AS SELECT 1;");
    assert!(engine.inspect(&bytes).unwrap().is_empty());
    let err = engine.execute(&handle(bytes), &QuerySpec::full_dump(None, None)).unwrap_err();
    assert_eq!(err, EngineError::NoTables);
}

#[test]
fn export_reads_every_row_and_storage_class() {
    let engine = SqliteTableEngine::new();
    let rows = engine.export(&handle(people()), table("people").as_ref()).unwrap();
    assert_eq!(rows.rows.len(), 31);
    let last = &rows.rows[30].0;
    assert_eq!(last[1].value, CellValue::Text("it's".to_string()));
    assert_eq!(last[2].value, CellValue::Null);
    assert_eq!(last[3].value, CellValue::Blob(vec![1, 2]));
}

#[test]
fn wal_mode_files_are_readable() {
    let bytes = database(
        "PRAGMA journal_mode = WAL;
         CREATE TABLE t (n INTEGER);
         INSERT INTO t VALUES (7);",
    );
    let engine = SqliteTableEngine::new();
    let rows = engine.execute(&handle(bytes), &QuerySpec::full_dump(table("t"), None)).unwrap();
    assert_eq!(ids(&rows), vec![7]);
}

#[test]
fn scratch_files_are_removed_after_queries() {
    let scratch = TempDir::new().unwrap();
    let engine = SqliteTableEngine::with_scratch_dir(scratch.path());
    engine.execute(&handle(people()), &QuerySpec::full_dump(None, None)).unwrap();
    engine.inspect(b"garbage bytes that are not a database at all").unwrap_err();
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}
