// crates/tablehub-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Metadata Store
// Description: Durable MetadataStore backed by SQLite.
// Purpose: Persist version records, stars, and row-cap preferences.
// Dependencies: tablehub-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`MetadataStore`] using `SQLite`. Version
//! records are append-only: `(owner, name, version)` is the primary key and
//! `(bucket, object_id)` is unique, so a racing writer fails with a conflict
//! instead of overwriting. Only the visibility column is ever updated.
//! Rows are decoded back through the identifier validators and fail closed
//! as corruption when stored values no longer validate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use tablehub_core::BucketName;
use tablehub_core::DatabaseName;
use tablehub_core::DatabaseRecord;
use tablehub_core::HashAlgorithm;
use tablehub_core::HashDigest;
use tablehub_core::IdentifierError;
use tablehub_core::MetadataError;
use tablehub_core::MetadataStore;
use tablehub_core::ObjectId;
use tablehub_core::StorageLocator;
use tablehub_core::UserName;
use tablehub_core::Version;
use tablehub_core::Visibility;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Columns selected for a [`DatabaseRecord`], in decode order.
const RECORD_COLUMNS: &str = "owner, name, folder, version, digest, hash_algorithm, size_bytes, \
                              visibility, bucket, object_id, created_at";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` metadata store.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default pragmas for a path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Uniqueness constraint rejected a write.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// Stored data failed validation.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store input.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Target record does not exist.
    #[error("sqlite store record missing: {0}")]
    Missing(String),
}

impl From<SqliteStoreError> for MetadataError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) | SqliteStoreError::Db(message) => {
                Self::Unavailable(message)
            }
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::Corrupt(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Corrupt(message)
            }
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Missing(message) => Self::Missing(message),
        }
    }
}

/// Maps an engine error, classifying constraint violations as conflicts.
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => SqliteStoreError::Conflict(err.to_string()),
        _ => SqliteStoreError::Db(err.to_string()),
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed metadata store.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteMetadataStore {
    /// Opens an `SQLite`-backed metadata store, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Returns the highest stored version for a database pair.
    fn load_highest_version(
        &self,
        owner: &UserName,
        name: &DatabaseName,
    ) -> Result<Option<Version>, SqliteStoreError> {
        let guard = self.lock()?;
        let highest: Option<i64> = guard
            .query_row(
                "SELECT MAX(version) FROM databases WHERE owner = ?1 AND name = ?2",
                params![owner.as_str(), name.as_str()],
                |row| row.get(0),
            )
            .map_err(db_error)?;
        highest.map(decode_version).transpose()
    }

    /// Loads one version record.
    fn load_record(
        &self,
        owner: &UserName,
        name: &DatabaseName,
        version: Version,
    ) -> Result<Option<DatabaseRecord>, SqliteStoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM databases WHERE owner = ?1 AND name = ?2 AND \
                     version = ?3"
                ),
                params![owner.as_str(), name.as_str(), i64::from(version.get())],
                RawRecord::from_row,
            )
            .optional()
            .map_err(db_error)?;
        row.map(RawRecord::decode).transpose()
    }

    /// Inserts one version record.
    fn save_record(&self, record: &DatabaseRecord) -> Result<(), SqliteStoreError> {
        let size_bytes = i64::try_from(record.size_bytes)
            .map_err(|_| SqliteStoreError::Invalid("size_bytes too large".to_string()))?;
        let created_at = i64::try_from(record.created_at_ms)
            .map_err(|_| SqliteStoreError::Invalid("created_at too large".to_string()))?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO databases (owner, name, folder, version, digest, hash_algorithm, \
                 size_bytes, visibility, bucket, object_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.owner.as_str(),
                    record.name.as_str(),
                    record.folder,
                    i64::from(record.version.get()),
                    record.digest.value,
                    record.digest.algorithm.as_str(),
                    size_bytes,
                    record.visibility.as_str(),
                    record.locator.bucket.as_str(),
                    record.locator.object_id.as_str(),
                    created_at,
                ],
            )
            .map_err(db_error)?;
        Ok(())
    }

    /// Updates visibility on every version of a database pair.
    fn update_visibility(
        &self,
        owner: &UserName,
        name: &DatabaseName,
        visibility: Visibility,
    ) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        let updated = guard
            .execute(
                "UPDATE databases SET visibility = ?3 WHERE owner = ?1 AND name = ?2",
                params![owner.as_str(), name.as_str(), visibility.as_str()],
            )
            .map_err(db_error)?;
        if updated == 0 {
            return Err(SqliteStoreError::Missing(format!("{owner}/{name}")));
        }
        Ok(())
    }

    /// Returns true when a storage locator is already recorded.
    fn locator_exists(
        &self,
        bucket: &BucketName,
        object_id: &ObjectId,
    ) -> Result<bool, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM databases WHERE bucket = ?1 AND object_id = ?2)",
                params![bucket.as_str(), object_id.as_str()],
                |row| row.get(0),
            )
            .map_err(db_error)
    }

    /// Loads the latest record of every database owned by a user.
    fn load_latest_records(
        &self,
        owner: &UserName,
    ) -> Result<Vec<DatabaseRecord>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM databases AS d WHERE owner = ?1 AND version = \
                 (SELECT MAX(version) FROM databases WHERE owner = d.owner AND name = d.name)
                 ORDER BY name"
            ))
            .map_err(db_error)?;
        let rows = stmt
            .query_map(params![owner.as_str()], RawRecord::from_row)
            .map_err(db_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error)?;
        rows.into_iter().map(RawRecord::decode).collect()
    }

    /// Toggles a star inside one transaction.
    fn flip_star(
        &self,
        user: &UserName,
        owner: &UserName,
        name: &DatabaseName,
    ) -> Result<bool, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM databases WHERE owner = ?1 AND name = ?2)",
                params![owner.as_str(), name.as_str()],
                |row| row.get(0),
            )
            .map_err(db_error)?;
        if !exists {
            return Err(SqliteStoreError::Missing(format!("{owner}/{name}")));
        }
        let removed = tx
            .execute(
                "DELETE FROM stars WHERE user = ?1 AND owner = ?2 AND name = ?3",
                params![user.as_str(), owner.as_str(), name.as_str()],
            )
            .map_err(db_error)?;
        if removed == 0 {
            tx.execute(
                "INSERT INTO stars (user, owner, name, starred_at) VALUES (?1, ?2, ?3, ?4)",
                params![user.as_str(), owner.as_str(), name.as_str(), unix_millis()],
            )
            .map_err(db_error)?;
        }
        tx.commit().map_err(db_error)?;
        Ok(removed == 0)
    }

    /// Counts stars on a database pair.
    fn count_stars(&self, owner: &UserName, name: &DatabaseName) -> Result<u64, SqliteStoreError> {
        let guard = self.lock()?;
        let count: i64 = guard
            .query_row(
                "SELECT COUNT(*) FROM stars WHERE owner = ?1 AND name = ?2",
                params![owner.as_str(), name.as_str()],
                |row| row.get(0),
            )
            .map_err(db_error)?;
        u64::try_from(count).map_err(|_| SqliteStoreError::Corrupt("negative star count".to_string()))
    }

    /// Lists users starring a database pair.
    fn load_stargazers(
        &self,
        owner: &UserName,
        name: &DatabaseName,
    ) -> Result<Vec<UserName>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare("SELECT user FROM stars WHERE owner = ?1 AND name = ?2 ORDER BY user")
            .map_err(db_error)?;
        let users = stmt
            .query_map(params![owner.as_str(), name.as_str()], |row| row.get::<_, String>(0))
            .map_err(db_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error)?;
        users.iter().map(|user| decode_identifier(UserName::parse(user))).collect()
    }

    /// Loads a user's row cap preference.
    fn load_max_rows(&self, user: &UserName) -> Result<Option<u32>, SqliteStoreError> {
        let guard = self.lock()?;
        let value: Option<i64> = guard
            .query_row(
                "SELECT max_rows FROM preferences WHERE user = ?1",
                params![user.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        value
            .map(|value| {
                u32::try_from(value)
                    .map_err(|_| SqliteStoreError::Corrupt(format!("invalid max_rows: {value}")))
            })
            .transpose()
    }

    /// Stores a user's row cap preference.
    fn save_max_rows(&self, user: &UserName, max_rows: u32) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO preferences (user, max_rows) VALUES (?1, ?2)
                 ON CONFLICT(user) DO UPDATE SET max_rows = excluded.max_rows",
                params![user.as_str(), i64::from(max_rows)],
            )
            .map_err(db_error)?;
        Ok(())
    }
}

impl MetadataStore for SqliteMetadataStore {
    fn highest_version(
        &self,
        owner: &UserName,
        name: &DatabaseName,
    ) -> Result<Option<Version>, MetadataError> {
        self.load_highest_version(owner, name).map_err(MetadataError::from)
    }

    fn record(
        &self,
        owner: &UserName,
        name: &DatabaseName,
        version: Version,
    ) -> Result<Option<DatabaseRecord>, MetadataError> {
        self.load_record(owner, name, version).map_err(MetadataError::from)
    }

    fn insert_record(&self, record: &DatabaseRecord) -> Result<(), MetadataError> {
        self.save_record(record).map_err(MetadataError::from)
    }

    fn set_visibility(
        &self,
        owner: &UserName,
        name: &DatabaseName,
        visibility: Visibility,
    ) -> Result<(), MetadataError> {
        self.update_visibility(owner, name, visibility).map_err(MetadataError::from)
    }

    fn object_id_in_use(
        &self,
        bucket: &BucketName,
        object_id: &ObjectId,
    ) -> Result<bool, MetadataError> {
        self.locator_exists(bucket, object_id).map_err(MetadataError::from)
    }

    fn list_databases(&self, owner: &UserName) -> Result<Vec<DatabaseRecord>, MetadataError> {
        self.load_latest_records(owner).map_err(MetadataError::from)
    }

    fn toggle_star(
        &self,
        user: &UserName,
        owner: &UserName,
        name: &DatabaseName,
    ) -> Result<bool, MetadataError> {
        self.flip_star(user, owner, name).map_err(MetadataError::from)
    }

    fn star_count(&self, owner: &UserName, name: &DatabaseName) -> Result<u64, MetadataError> {
        self.count_stars(owner, name).map_err(MetadataError::from)
    }

    fn stargazers(
        &self,
        owner: &UserName,
        name: &DatabaseName,
    ) -> Result<Vec<UserName>, MetadataError> {
        self.load_stargazers(owner, name).map_err(MetadataError::from)
    }

    fn user_max_rows(&self, user: &UserName) -> Result<Option<u32>, MetadataError> {
        self.load_max_rows(user).map_err(MetadataError::from)
    }

    fn set_user_max_rows(&self, user: &UserName, max_rows: u32) -> Result<(), MetadataError> {
        self.save_max_rows(user, max_rows).map_err(MetadataError::from)
    }
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Undecoded record columns.
struct RawRecord {
    /// Owner column.
    owner: String,
    /// Name column.
    name: String,
    /// Folder column.
    folder: String,
    /// Version column.
    version: i64,
    /// Digest column.
    digest: String,
    /// Hash algorithm column.
    hash_algorithm: String,
    /// Size column.
    size_bytes: i64,
    /// Visibility column.
    visibility: String,
    /// Bucket column.
    bucket: String,
    /// Object identifier column.
    object_id: String,
    /// Creation time column.
    created_at: i64,
}

impl RawRecord {
    /// Reads columns in [`RECORD_COLUMNS`] order.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            owner: row.get(0)?,
            name: row.get(1)?,
            folder: row.get(2)?,
            version: row.get(3)?,
            digest: row.get(4)?,
            hash_algorithm: row.get(5)?,
            size_bytes: row.get(6)?,
            visibility: row.get(7)?,
            bucket: row.get(8)?,
            object_id: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    /// Validates raw columns into a record.
    fn decode(self) -> Result<DatabaseRecord, SqliteStoreError> {
        let visibility = Visibility::from_label(&self.visibility).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("invalid visibility: {}", self.visibility))
        })?;
        Ok(DatabaseRecord {
            owner: decode_identifier(UserName::parse(&self.owner))?,
            name: decode_identifier(DatabaseName::parse(&self.name))?,
            folder: self.folder,
            version: decode_version(self.version)?,
            digest: HashDigest {
                algorithm: parse_hash_algorithm(&self.hash_algorithm)?,
                value: self.digest,
            },
            size_bytes: u64::try_from(self.size_bytes)
                .map_err(|_| SqliteStoreError::Corrupt("negative size_bytes".to_string()))?,
            visibility,
            locator: StorageLocator::new(
                decode_identifier(BucketName::parse(&self.bucket))?,
                decode_identifier(ObjectId::parse(&self.object_id))?,
            ),
            created_at_ms: u64::try_from(self.created_at).unwrap_or(0),
        })
    }
}

/// Maps a stored identifier that no longer validates to corruption.
fn decode_identifier<T>(
    result: Result<T, IdentifierError>,
) -> Result<T, SqliteStoreError> {
    result.map_err(|err| SqliteStoreError::Corrupt(err.to_string()))
}

/// Decodes a stored version number.
fn decode_version(value: i64) -> Result<Version, SqliteStoreError> {
    u32::try_from(value)
        .ok()
        .and_then(Version::new)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("invalid version: {value}")))
}

/// Parses a hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    match label {
        "sha256" => Ok(HashAlgorithm::Sha256),
        other => Err(SqliteStoreError::Corrupt(format!("unsupported hash algorithm: {other}"))),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS databases (
                    owner TEXT NOT NULL,
                    name TEXT NOT NULL,
                    version INTEGER NOT NULL,
                    folder TEXT NOT NULL,
                    digest TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    size_bytes INTEGER NOT NULL,
                    visibility TEXT NOT NULL,
                    bucket TEXT NOT NULL,
                    object_id TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    PRIMARY KEY (owner, name, version),
                    UNIQUE (bucket, object_id)
                );
                CREATE TABLE IF NOT EXISTS stars (
                    user TEXT NOT NULL,
                    owner TEXT NOT NULL,
                    name TEXT NOT NULL,
                    starred_at INTEGER NOT NULL,
                    PRIMARY KEY (user, owner, name)
                );
                CREATE INDEX IF NOT EXISTS idx_stars_database ON stars (owner, name);
                CREATE TABLE IF NOT EXISTS preferences (
                    user TEXT PRIMARY KEY,
                    max_rows INTEGER NOT NULL
                );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use rusqlite::ErrorCode;
    use rusqlite::ffi;

    use super::SqliteStoreError;
    use super::db_error;

    #[test]
    fn constraint_violations_map_to_conflicts() {
        let err = rusqlite::Error::SqliteFailure(
            ffi::Error {
                code: ErrorCode::ConstraintViolation,
                extended_code: ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
            },
            None,
        );
        assert!(matches!(db_error(err), SqliteStoreError::Conflict(_)));
    }
}
