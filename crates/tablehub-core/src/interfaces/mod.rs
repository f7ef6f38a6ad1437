// crates/tablehub-core/src/interfaces/mod.rs
// ============================================================================
// Module: Tablehub Interfaces
// Description: Backend-agnostic interfaces for metadata, objects, and queries.
// Purpose: Define the contract surfaces used by the Tablehub runtime.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Tablehub reaches its backends without embedding
//! backend-specific details: a metadata store for version records, stars, and
//! preferences, an object store for immutable database files, an embedded
//! table engine, and a result cache. Every implementation must be
//! `Send + Sync`; the runtime shares them across request workers behind `Arc`.
//! Implementations fail closed on missing or invalid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::fingerprint::Fingerprint;
use crate::core::identifiers::BucketName;
use crate::core::identifiers::DatabaseName;
use crate::core::identifiers::ObjectId;
use crate::core::identifiers::TableName;
use crate::core::identifiers::UserName;
use crate::core::identifiers::Version;
use crate::core::query::QuerySpec;
use crate::core::query::RowSet;
use crate::core::records::DatabaseRecord;
use crate::core::records::StorageLocator;
use crate::core::records::Visibility;

// ============================================================================
// SECTION: Metadata Store
// ============================================================================

/// Metadata store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// Backend could not be reached or failed an operation.
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
    /// A uniqueness constraint rejected the write.
    #[error("metadata conflict: {0}")]
    Conflict(String),
    /// Stored data failed integrity checks.
    #[error("metadata corruption: {0}")]
    Corrupt(String),
    /// Input was rejected by the store.
    #[error("metadata invalid: {0}")]
    Invalid(String),
    /// Target record does not exist.
    #[error("metadata record missing: {0}")]
    Missing(String),
}

/// Store of database version records, stars, and user preferences.
pub trait MetadataStore: Send + Sync {
    /// Returns the highest stored version for a database, if any.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the lookup fails.
    fn highest_version(
        &self,
        owner: &UserName,
        name: &DatabaseName,
    ) -> Result<Option<Version>, MetadataError>;

    /// Returns the record for an exact version, if stored.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the lookup fails.
    fn record(
        &self,
        owner: &UserName,
        name: &DatabaseName,
        version: Version,
    ) -> Result<Option<DatabaseRecord>, MetadataError>;

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Conflict`] when `(owner, name, version)` or the
    /// storage locator is already recorded.
    fn insert_record(&self, record: &DatabaseRecord) -> Result<(), MetadataError>;

    /// Sets the visibility of every version of a database.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Missing`] when the database has no records.
    fn set_visibility(
        &self,
        owner: &UserName,
        name: &DatabaseName,
        visibility: Visibility,
    ) -> Result<(), MetadataError>;

    /// Returns true when an object identifier is already used in a bucket.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the lookup fails.
    fn object_id_in_use(
        &self,
        bucket: &BucketName,
        object_id: &ObjectId,
    ) -> Result<bool, MetadataError>;

    /// Lists the latest record of every database owned by a user, by name.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the lookup fails.
    fn list_databases(&self, owner: &UserName) -> Result<Vec<DatabaseRecord>, MetadataError>;

    /// Toggles a user's star on a database and returns the new state.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the update fails.
    fn toggle_star(
        &self,
        user: &UserName,
        owner: &UserName,
        name: &DatabaseName,
    ) -> Result<bool, MetadataError>;

    /// Returns the number of users who starred a database.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the lookup fails.
    fn star_count(&self, owner: &UserName, name: &DatabaseName) -> Result<u64, MetadataError>;

    /// Returns the users who starred a database, by name.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the lookup fails.
    fn stargazers(
        &self,
        owner: &UserName,
        name: &DatabaseName,
    ) -> Result<Vec<UserName>, MetadataError>;

    /// Returns a user's preferred row cap, if set.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the lookup fails.
    fn user_max_rows(&self, user: &UserName) -> Result<Option<u32>, MetadataError>;

    /// Stores a user's preferred row cap.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the update fails.
    fn set_user_max_rows(&self, user: &UserName, max_rows: u32) -> Result<(), MetadataError>;
}

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// Object store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectStoreError {
    /// Backend could not be reached, failed, or timed out.
    #[error("object store unavailable: {0}")]
    Unavailable(String),
    /// Object does not exist.
    #[error("object missing: {0}")]
    Missing(String),
    /// Request was rejected before reaching the backend.
    #[error("object store invalid request: {0}")]
    Invalid(String),
    /// An object is already stored under the requested identifier.
    #[error("object already exists: {0}")]
    Exists(String),
    /// Object exceeds the configured size limit.
    #[error("object exceeds size limit: {actual_bytes} > {max_bytes}")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual object size in bytes.
        actual_bytes: u64,
    },
}

/// Read handle over the bytes of a stored object.
///
/// The handle owns its buffer; dropping it releases the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHandle {
    /// Locator the bytes were fetched from.
    locator: StorageLocator,
    /// Object contents.
    bytes: Vec<u8>,
}

impl ObjectHandle {
    /// Creates a handle over fetched object bytes.
    #[must_use]
    pub const fn new(locator: StorageLocator, bytes: Vec<u8>) -> Self {
        Self {
            locator,
            bytes,
        }
    }

    /// Returns the locator the handle was opened for.
    #[must_use]
    pub const fn locator(&self) -> &StorageLocator {
        &self.locator
    }

    /// Returns the object bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the object size in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Returns true when the object is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consumes the handle and returns the object bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Content-addressed store of immutable database files.
pub trait ObjectStore: Send + Sync {
    /// Opens a stored object for reading.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Missing`] when the object is gone and
    /// [`ObjectStoreError::Unavailable`] on backend failures.
    fn open_for_read(&self, locator: &StorageLocator) -> Result<ObjectHandle, ObjectStoreError>;

    /// Stores a new object and returns its size in bytes.
    ///
    /// Stored objects are never replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Exists`] when the identifier is already
    /// taken in the bucket and [`ObjectStoreError`] when the write fails.
    fn store(
        &self,
        bucket: &BucketName,
        object_id: &ObjectId,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<u64, ObjectStoreError>;
}

// ============================================================================
// SECTION: Table Engine
// ============================================================================

/// Table engine errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Database contains no tables.
    #[error("database contains no tables")]
    NoTables,
    /// Requested table does not exist.
    #[error("table not found: {0}")]
    TableNotFound(String),
    /// Requested column does not exist.
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    /// Bytes are not a readable database.
    #[error("not a database: {0}")]
    NotADatabase(String),
    /// Scratch file handling failed.
    #[error("engine io error: {0}")]
    Io(String),
    /// Query execution failed.
    #[error("query failed: {0}")]
    Query(String),
}

/// Embedded engine that reads tables out of stored database files.
pub trait TableEngine: Send + Sync {
    /// Opens raw bytes read-only and returns their table names, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotADatabase`] when the bytes cannot be opened.
    fn inspect(&self, bytes: &[u8]) -> Result<Vec<String>, EngineError>;

    /// Runs a query against a stored object.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the table is missing or the query fails.
    fn execute(&self, handle: &ObjectHandle, spec: &QuerySpec) -> Result<RowSet, EngineError>;

    /// Reads every row of a table without a row cap.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the table is missing or the read fails.
    fn export(
        &self,
        handle: &ObjectHandle,
        table: Option<&TableName>,
    ) -> Result<RowSet, EngineError>;
}

// ============================================================================
// SECTION: Result Cache
// ============================================================================

/// Result cache errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Cache backend failed.
    #[error("result cache unavailable: {0}")]
    Unavailable(String),
}

/// Fingerprint-keyed cache of serialized response bodies.
pub trait ResultCache: Send + Sync {
    /// Returns the cached body for a fingerprint when present and unexpired.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend fails.
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Arc<[u8]>>, CacheError>;

    /// Stores a body for a fingerprint, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend fails.
    fn put(&self, fingerprint: Fingerprint, body: Vec<u8>, ttl: Duration)
    -> Result<(), CacheError>;
}
