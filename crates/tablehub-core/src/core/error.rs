// crates/tablehub-core/src/core/error.rs
// ============================================================================
// Module: Tablehub Errors
// Description: Service-level error taxonomy.
// Purpose: Map component failures onto the errors callers act on.
// Dependencies: thiserror, crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`TablehubError`] is the error returned by every runtime operation.
//! Component errors convert into it with `From`, so runtime code propagates
//! them with `?`. [`TablehubError::public_message`] collapses the
//! existence-revealing variants into one generic message so responses do not
//! tell unauthorized callers whether a private database exists.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::IdentifierError;
use crate::core::query::QueryError;
use crate::interfaces::EngineError;
use crate::interfaces::MetadataError;
use crate::interfaces::ObjectStoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message shown for missing or inaccessible databases.
const NOT_AVAILABLE_MESSAGE: &str = "database not found or not accessible";

// ============================================================================
// SECTION: Error Type
// ============================================================================

/// Service-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TablehubError {
    /// Request input was malformed.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    /// Uploaded database name was rejected.
    #[error("invalid database name: {0}")]
    InvalidName(String),
    /// Requester may not perform the operation.
    #[error("access denied")]
    AccessDenied,
    /// Database does not exist.
    #[error("database not found")]
    NotFound,
    /// Requested version does not exist.
    #[error("version not found")]
    VersionNotFound,
    /// Requested table does not exist.
    #[error("table not found: {0}")]
    TableNotFound(String),
    /// Requested column does not exist.
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    /// Database contains no tables.
    #[error("database contains no tables")]
    NoTablesInDatabase,
    /// Bytes are not a readable database.
    #[error("not a database: {0}")]
    NotADatabase(String),
    /// Metadata points at an object that no longer exists.
    #[error("stored object missing")]
    ObjectMissing,
    /// A storage backend failed or timed out.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// No unused object identifier was found.
    #[error("object identifier space exhausted")]
    StorageExhausted,
    /// Upload contained no bytes.
    #[error("empty upload")]
    EmptyUpload,
    /// A concurrent writer claimed the same version.
    #[error("version conflict: {0}")]
    VersionConflict(String),
    /// Internal invariant failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TablehubError {
    /// Returns true when retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }

    /// Returns the message safe to show an untrusted caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::AccessDenied | Self::NotFound | Self::VersionNotFound => {
                NOT_AVAILABLE_MESSAGE.to_string()
            }
            Self::StorageUnavailable(_) | Self::Internal(_) => {
                "service temporarily unavailable".to_string()
            }
            other => other.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl From<IdentifierError> for TablehubError {
    fn from(err: IdentifierError) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

impl From<QueryError> for TablehubError {
    fn from(err: QueryError) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

impl From<MetadataError> for TablehubError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::Unavailable(message) => Self::StorageUnavailable(message),
            MetadataError::Conflict(message) => Self::VersionConflict(message),
            MetadataError::Corrupt(message) => Self::Internal(message),
            MetadataError::Invalid(message) => Self::InvalidFormat(message),
            MetadataError::Missing(_) => Self::NotFound,
        }
    }
}

impl From<ObjectStoreError> for TablehubError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::Unavailable(message) => Self::StorageUnavailable(message),
            ObjectStoreError::Missing(_) => Self::ObjectMissing,
            ObjectStoreError::Invalid(message) => Self::InvalidFormat(message),
            ObjectStoreError::Exists(message) => Self::Internal(message),
            err @ ObjectStoreError::TooLarge {
                ..
            } => Self::InvalidFormat(err.to_string()),
        }
    }
}

impl From<EngineError> for TablehubError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NoTables => Self::NoTablesInDatabase,
            EngineError::TableNotFound(table) => Self::TableNotFound(table),
            EngineError::ColumnNotFound(column) => Self::ColumnNotFound(column),
            EngineError::NotADatabase(message) => Self::NotADatabase(message),
            EngineError::Io(message) => Self::StorageUnavailable(message),
            EngineError::Query(message) => Self::Internal(message),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::TablehubError;
    use crate::interfaces::MetadataError;

    #[test]
    fn existence_errors_share_one_public_message() {
        let denied = TablehubError::AccessDenied.public_message();
        assert_eq!(denied, TablehubError::NotFound.public_message());
        assert_eq!(denied, TablehubError::VersionNotFound.public_message());
    }

    #[test]
    fn only_storage_outages_are_retryable() {
        assert!(TablehubError::StorageUnavailable("timeout".to_string()).is_retryable());
        assert!(!TablehubError::ObjectMissing.is_retryable());
        assert!(!TablehubError::VersionConflict("dup".to_string()).is_retryable());
    }

    #[test]
    fn metadata_conflicts_surface_as_version_conflicts() {
        let err = TablehubError::from(MetadataError::Conflict("dup".to_string()));
        assert!(matches!(err, TablehubError::VersionConflict(_)));
    }
}
