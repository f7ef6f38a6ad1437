// crates/tablehub-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests running the tablehub binary end to end.
// Purpose: Ensure commands wire configuration, storage, and access control.
// Dependencies: tablehub-cli binary, rusqlite, tempfile
// ============================================================================
//! ## Overview
//! Writes a configuration rooted in a scoped temporary directory, uploads a
//! real SQLite file through the binary, and reads it back through the query,
//! export, and listing commands.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use rusqlite::Connection;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn tablehub_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tablehub"))
}

fn write_config(root: &Path) -> PathBuf {
    let config_path = root.join("tablehub.toml");
    let config = format!(
        "[metadata]\npath = {:?}\n\n[object_store]\nroot = {:?}\n\n[audit]\nsink = \"none\"\n",
        root.join("meta.sqlite").to_string_lossy(),
        root.join("objects").to_string_lossy(),
    );
    std::fs::write(&config_path, config).expect("write config");
    config_path
}

fn write_database(root: &Path) -> PathBuf {
    let path = root.join("cities.db");
    let connection = Connection::open(&path).expect("open upload");
    connection
        .execute_batch(
            "CREATE TABLE cities (name TEXT, population INTEGER);
             INSERT INTO cities VALUES ('Oslo', 700), ('Bergen', 285), ('Tromso', 77);",
        )
        .expect("seed upload");
    path
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(tablehub_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("run tablehub")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Verifies config validation reports success.
#[test]
fn config_validate_accepts_valid_config() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    let output = run(&config, &["config", "validate"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Config valid"));
}

/// Verifies invalid configuration fails closed.
#[test]
fn config_validate_rejects_invalid_limits() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("tablehub.toml");
    std::fs::write(&config, "[limits]\nanonymous_max_rows = 0\n").unwrap();
    let output = run(&config, &["config", "validate"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to load config"));
}

/// Verifies an upload is listed and readable by its owner.
#[test]
fn upload_then_read_back_as_owner() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    let file = write_database(root.path());
    let file = file.to_string_lossy();

    let output = run(&config, &["--user", "alice", "upload", &file]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("alice/cities.db version 1"));

    let output = run(&config, &["--user", "alice", "table", "alice", "cities.db"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let body = stdout(&output);
    assert!(body.contains("\"table\":\"cities\""), "unexpected table output: {body}");
    assert!(body.contains("Bergen"));

    let output = run(&config, &["--user", "alice", "csv", "alice", "cities.db"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).starts_with("name,population\r\n"));

    let output = run(&config, &["--user", "alice", "list", "alice"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("cities.db"));
}

/// Verifies private databases look missing to anonymous requesters.
#[test]
fn private_databases_are_hidden_from_anonymous_requesters() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    let file = write_database(root.path());
    let output = run(&config, &["--user", "alice", "upload", &file.to_string_lossy()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = run(&config, &["table", "alice", "cities.db"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("database not found or not accessible"));

    let output = run(&config, &["list", "alice"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "{\"databases\":[]}");

    let output = run(&config, &["--user", "alice", "visibility", "alice", "cities.db", "public"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let output = run(&config, &["table", "alice", "cities.db"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

/// Verifies download writes the uploaded bytes unchanged.
#[test]
fn download_writes_original_bytes() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    let file = write_database(root.path());
    let output = run(&config, &["--user", "bob", "upload", "--public", &file.to_string_lossy()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let target = root.path().join("copy.db");
    let output = run(
        &config,
        &["download", "bob", "cities.db", "--version", "1", "--output", &target.to_string_lossy()],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(std::fs::read(&target).unwrap(), std::fs::read(&file).unwrap());
}

/// Verifies anonymous requesters cannot upload.
#[test]
fn anonymous_upload_is_denied() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    let file = write_database(root.path());
    let output = run(&config, &["upload", &file.to_string_lossy()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("upload failed"));
}

/// Verifies row cap preferences persist between invocations.
#[test]
fn prefs_round_trip_through_metadata_store() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    let output = run(&config, &["--user", "carol", "prefs", "--max-rows", "42"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let output = run(&config, &["--user", "carol", "prefs"]);
    assert!(stdout(&output).contains("Row cap: 42"));
    let output = run(&config, &["prefs"]);
    assert!(stdout(&output).contains("Row cap: 10"));
}

/// Verifies chart output falls back to a table dump without columns.
#[test]
fn chart_without_columns_returns_table_rows() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    let file = write_database(root.path());
    let output = run(&config, &["--user", "dana", "upload", "--public", &file.to_string_lossy()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = run(&config, &["chart", "dana", "cities.db"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let body = stdout(&output);
    assert!(body.contains("\"rowCount\":3"), "unexpected chart output: {body}");
    assert!(body.contains("Tromso"));
}
