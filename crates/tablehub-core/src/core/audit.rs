// crates/tablehub-core/src/core/audit.rs
// ============================================================================
// Module: Tablehub Audit Logging
// Description: Structured audit events for uploads, access, and caching.
// Purpose: Emit JSON-line audit logs without hard dependencies.
// Dependencies: serde, serde_json, crate::core::{identifiers, records}
// ============================================================================

//! ## Overview
//! Audit events are small serializable payloads written as one JSON object
//! per line. Sinks decide where the lines go: stderr, an append-only file,
//! nowhere, or an in-memory buffer that tests inspect.
//!
//! Validation events carry a `noise` flag. Template placeholders injected by
//! crawlers are recorded with `noise: true` so operators can filter them out
//! of error dashboards. Raw rejected input is never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::DatabaseName;
use crate::core::identifiers::IdentifierError;
use crate::core::identifiers::IdentifierKind;
use crate::core::identifiers::IdentifierRejection;
use crate::core::identifiers::Requester;
use crate::core::identifiers::UserName;
use crate::core::records::DatabaseRecord;
use crate::core::records::Visibility;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit event for a stored upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Database owner.
    pub owner: String,
    /// Database name.
    pub database: String,
    /// Assigned version.
    pub version: u32,
    /// Stored size in bytes.
    pub size_bytes: u64,
    /// Hex-encoded content digest.
    pub digest: String,
    /// Visibility at upload time.
    pub visibility: Visibility,
    /// Storage object identifier.
    pub object_id: String,
}

impl UploadAuditEvent {
    /// Builds an upload event from the inserted record.
    #[must_use]
    pub fn from_record(record: &DatabaseRecord) -> Self {
        Self {
            event: "upload",
            timestamp_ms: now_ms(),
            owner: record.owner.to_string(),
            database: record.name.to_string(),
            version: record.version.get(),
            size_bytes: record.size_bytes,
            digest: record.digest.value.clone(),
            visibility: record.visibility,
            object_id: record.locator.object_id.to_string(),
        }
    }
}

/// Outcome label for access events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOutcome {
    /// Requester was refused.
    Denied,
    /// Database or version did not exist.
    NotFound,
}

/// Audit event for refused or failed database access.
#[derive(Debug, Clone, Serialize)]
pub struct AccessAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Operation label.
    pub operation: &'static str,
    /// Requesting user, absent for anonymous.
    pub requester: Option<String>,
    /// Database owner.
    pub owner: String,
    /// Database name.
    pub database: String,
    /// Access outcome.
    pub outcome: AccessOutcome,
}

impl AccessAuditEvent {
    /// Creates a new access event.
    #[must_use]
    pub fn new(
        operation: &'static str,
        requester: &Requester,
        owner: &UserName,
        database: &DatabaseName,
        outcome: AccessOutcome,
    ) -> Self {
        Self {
            event: "access",
            timestamp_ms: now_ms(),
            operation,
            requester: requester.user().map(ToString::to_string),
            owner: owner.to_string(),
            database: database.to_string(),
            outcome,
        }
    }
}

/// Audit event for a rejected identifier.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Identifier category.
    pub kind: IdentifierKind,
    /// Rejection reason.
    pub rejection: IdentifierRejection,
    /// True when the rejection is routine bot noise.
    pub noise: bool,
}

impl ValidationAuditEvent {
    /// Builds a validation event from an identifier error.
    #[must_use]
    pub fn from_error(err: &IdentifierError) -> Self {
        Self {
            event: "validation",
            timestamp_ms: now_ms(),
            kind: err.kind,
            rejection: err.rejection,
            noise: err.is_noise(),
        }
    }
}

/// Outcome label for cache events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOutcome {
    /// Body served from cache.
    Hit,
    /// No usable entry was cached.
    Miss,
    /// Body was written to cache.
    Store,
    /// Cache backend failed; the request proceeded uncached.
    Error,
}

/// Audit event for result cache behaviour.
#[derive(Debug, Clone, Serialize)]
pub struct CacheAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Cache outcome.
    pub outcome: CacheOutcome,
    /// Fingerprint of the entry.
    pub fingerprint: String,
}

impl CacheAuditEvent {
    /// Creates a new cache event.
    #[must_use]
    pub fn new(outcome: CacheOutcome, fingerprint: &str) -> Self {
        Self {
            event: "cache",
            timestamp_ms: now_ms(),
            outcome,
            fingerprint: fingerprint.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for Tablehub events.
pub trait AuditSink: Send + Sync {
    /// Record an upload event.
    fn record_upload(&self, _event: &UploadAuditEvent) {}

    /// Record an access event.
    fn record_access(&self, _event: &AccessAuditEvent) {}

    /// Record a validation event.
    fn record_validation(&self, _event: &ValidationAuditEvent) {}

    /// Record a cache event.
    fn record_cache(&self, _event: &CacheAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one event line to stderr.
    fn emit<T: Serialize>(event: &T) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

impl AuditSink for StderrAuditSink {
    fn record_upload(&self, event: &UploadAuditEvent) {
        Self::emit(event);
    }

    fn record_access(&self, event: &AccessAuditEvent) {
        Self::emit(event);
    }

    fn record_validation(&self, event: &ValidationAuditEvent) {
        Self::emit(event);
    }

    fn record_cache(&self, event: &CacheAuditEvent) {
        Self::emit(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one event line.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_upload(&self, event: &UploadAuditEvent) {
        self.emit(event);
    }

    fn record_access(&self, event: &AccessAuditEvent) {
        self.emit(event);
    }

    fn record_validation(&self, event: &ValidationAuditEvent) {
        self.emit(event);
    }

    fn record_cache(&self, event: &CacheAuditEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {}

/// Audit sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events as JSON values.
    events: Mutex<Vec<Value>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<Value> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns recorded events whose `event` field matches the label.
    #[must_use]
    pub fn events_named(&self, label: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|event| event.get("event").and_then(Value::as_str) == Some(label))
            .collect()
    }

    /// Stores one event.
    fn push<T: Serialize>(&self, event: &T) {
        if let Ok(value) = serde_json::to_value(event)
            && let Ok(mut events) = self.events.lock()
        {
            events.push(value);
        }
    }
}

impl AuditSink for MemoryAuditSink {
    fn record_upload(&self, event: &UploadAuditEvent) {
        self.push(event);
    }

    fn record_access(&self, event: &AccessAuditEvent) {
        self.push(event);
    }

    fn record_validation(&self, event: &ValidationAuditEvent) {
        self.push(event);
    }

    fn record_cache(&self, event: &CacheAuditEvent) {
        self.push(event);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current time in milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|duration| duration.as_millis()).unwrap_or(0)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;
    use crate::core::identifiers::validate_table_name;

    #[test]
    fn placeholder_rejections_are_flagged_as_noise() {
        let sink = MemoryAuditSink::new();
        let err = validate_table_name("{{ db.Tablename }}").unwrap_err();
        sink.record_validation(&ValidationAuditEvent::from_error(&err));
        let events = sink.events_named("validation");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["noise"], Value::Bool(true));
        assert_eq!(events[0]["rejection"], Value::String("template_placeholder".to_string()));
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = std::env::temp_dir().join(format!("tablehub-audit-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("audit.log");
        let sink = FileAuditSink::new(&path).unwrap();
        sink.record_cache(&CacheAuditEvent::new(CacheOutcome::Hit, "abc"));
        sink.record_cache(&CacheAuditEvent::new(CacheOutcome::Store, "abc"));
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["outcome"], Value::String("hit".to_string()));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
