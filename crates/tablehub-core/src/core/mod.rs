// crates/tablehub-core/src/core/mod.rs
// ============================================================================
// Module: Tablehub Core Types
// Description: Identifiers, records, query model, and audit events.
// Purpose: Provide stable types shared by the runtime and every backend.
// Dependencies: base64, serde, sha2, thiserror
// ============================================================================

//! ## Overview
//! Core types are the vocabulary of Tablehub: validated identifiers, version
//! records and storage locators, the query model and its wire-format result,
//! cache fingerprints, the service error taxonomy, and audit events. They
//! carry no backend logic.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod error;
pub mod export;
pub mod fingerprint;
pub mod hashing;
pub mod identifiers;
pub mod query;
pub mod records;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AccessAuditEvent;
pub use audit::AccessOutcome;
pub use audit::AuditSink;
pub use audit::CacheAuditEvent;
pub use audit::CacheOutcome;
pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::UploadAuditEvent;
pub use audit::ValidationAuditEvent;
pub use error::TablehubError;
pub use export::CSV_CONTENT_TYPE;
pub use export::render_csv;
pub use fingerprint::Fingerprint;
pub use fingerprint::FingerprintInput;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::hash_bytes;
pub use identifiers::BranchName;
pub use identifiers::BucketName;
pub use identifiers::ColumnName;
pub use identifiers::CommitId;
pub use identifiers::DatabaseName;
pub use identifiers::IdentifierError;
pub use identifiers::IdentifierKind;
pub use identifiers::IdentifierRejection;
pub use identifiers::ObjectId;
pub use identifiers::Requester;
pub use identifiers::TableName;
pub use identifiers::UserName;
pub use identifiers::Version;
pub use identifiers::VersionSelector;
pub use identifiers::validate_branch_name;
pub use identifiers::validate_column_name;
pub use identifiers::validate_commit_id;
pub use identifiers::validate_database_name;
pub use identifiers::validate_new_user_name;
pub use identifiers::validate_table_name;
pub use identifiers::validate_user_name;
pub use query::Cell;
pub use query::CellValue;
pub use query::ChartParams;
pub use query::DEFAULT_ROW_CAP;
pub use query::FilterClause;
pub use query::FilterOperator;
pub use query::PROJECTION_MAX_ROWS;
pub use query::QueryError;
pub use query::QueryShape;
pub use query::QuerySpec;
pub use query::Row;
pub use query::RowSet;
pub use records::DatabaseRecord;
pub use records::DatabaseSummary;
pub use records::ROOT_FOLDER;
pub use records::StorageLocator;
pub use records::Visibility;
