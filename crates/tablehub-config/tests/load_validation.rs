// crates/tablehub-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load Validation Tests
// Description: Loading, defaults, and fail-closed validation of tablehub.toml.
// Purpose: Ensure invalid configuration is rejected before wiring.
// Dependencies: tablehub-config, tempfile
// ============================================================================
//! ## Overview
//! Writes configuration files into scoped temporary directories and checks
//! defaults, section parsing, and rejection of invalid values.

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

use std::path::PathBuf;
use std::time::Duration;

use tablehub_config::AuditSinkKind;
use tablehub_config::ConfigError;
use tablehub_config::ObjectStoreProvider;
use tablehub_config::TablehubConfig;
use tempfile::TempDir;

fn invalid(content: &str) -> String {
    match TablehubConfig::parse(content) {
        Err(ConfigError::Invalid(message)) => message,
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn empty_file_loads_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tablehub.toml");
    std::fs::write(&path, "").unwrap();
    let config = TablehubConfig::load(Some(&path)).unwrap();
    assert!(config.source_modified_at.is_some());
    assert_eq!(config.metadata.path, PathBuf::from("tablehub.sqlite"));
    assert_eq!(config.object_store.provider, ObjectStoreProvider::Filesystem);
    assert_eq!(config.object_store.filesystem_root(), PathBuf::from("objects"));
    assert_eq!(config.audit.sink, AuditSinkKind::Stderr);

    let limits = config.service_limits();
    assert_eq!(limits.anonymous_max_rows, 10);
    assert_eq!(limits.default_user_max_rows, 10);
    assert_eq!(limits.max_user_max_rows, 500);
    assert_eq!(limits.chart_max_rows, 2500);
    assert_eq!(limits.cache_ttl, Duration::from_secs(600));
    let uploads = config.upload_settings();
    assert_eq!(uploads.max_upload_bytes, 512 * 1024 * 1024);
    assert_eq!(uploads.object_id_attempts, 16);
}

#[test]
fn sections_override_defaults() {
    let config = TablehubConfig::parse(
        r#"
        [metadata]
        path = "data/meta.sqlite"
        journal_mode = "delete"
        sync_mode = "normal"

        [object_store]
        provider = "s3"
        bucket = "tablehub"
        region = "us-east-1"
        endpoint = "http://localhost:9000"
        allow_http = true
        force_path_style = true
        prefix = "prod/"

        [cache]
        ttl_seconds = 60

        [limits]
        max_user_max_rows = 1000
        default_user_max_rows = 25

        [audit]
        sink = "file"
        path = "audit.log"
        "#,
    )
    .unwrap();
    let store = config.metadata.store_config();
    assert_eq!(store.path, PathBuf::from("data/meta.sqlite"));
    assert_eq!(store.journal_mode.pragma_value(), "delete");
    assert_eq!(store.sync_mode.pragma_value(), "normal");
    assert_eq!(config.object_store.bucket.as_deref(), Some("tablehub"));
    assert_eq!(config.service_limits().cache_ttl, Duration::from_secs(60));
    assert_eq!(config.service_limits().default_user_max_rows, 25);
}

#[test]
fn unknown_fields_fail_to_parse() {
    let err = TablehubConfig::parse("[cache]\nttl = 5\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn invalid_limits_are_rejected() {
    assert!(invalid("[limits]\nanonymous_max_rows = 0\n").contains("anonymous_max_rows"));
    assert!(invalid("[limits]\ndefault_user_max_rows = 600\n").contains("default_user_max_rows"));
    assert!(invalid("[limits]\nchart_max_rows = 5000\n").contains("chart_max_rows"));
    assert!(invalid("[limits]\nobject_id_attempts = 0\n").contains("object_id_attempts"));
    assert!(invalid("[limits]\nmax_upload_bytes = 0\n").contains("max_upload_bytes"));
}

#[test]
fn invalid_object_store_settings_are_rejected() {
    assert!(invalid("[object_store]\nprovider = \"s3\"\n").contains("bucket"));
    assert!(
        invalid("[object_store]\nprovider = \"s3\"\nbucket = \"b\"\nendpoint = \"http://x\"\n")
            .contains("allow_http")
    );
    assert!(
        invalid("[object_store]\nprovider = \"s3\"\nbucket = \"b\"\nprefix = \"../up\"\n")
            .contains("traversal")
    );
    assert!(invalid("[object_store]\nbucket = \"b\"\n").contains("s3 provider only"));
}

#[test]
fn file_audit_sink_requires_a_path() {
    assert!(invalid("[audit]\nsink = \"file\"\n").contains("audit.path"));
    assert!(invalid("[audit]\nsink = \"none\"\npath = \"x.log\"\n").contains("file sink only"));
}

#[test]
fn file_audit_sink_builds_and_appends() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.log");
    let config = TablehubConfig::parse(&format!(
        "[audit]\nsink = \"file\"\npath = {:?}\n",
        path.to_string_lossy()
    ))
    .unwrap();
    config.audit.build_sink().unwrap();
    assert!(path.exists());
}

#[test]
fn missing_files_are_io_errors() {
    let dir = TempDir::new().unwrap();
    let err = TablehubConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
