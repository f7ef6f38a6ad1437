// crates/tablehub-core/src/runtime/upload.rs
// ============================================================================
// Module: Tablehub Upload Pipeline
// Description: Validate, digest, version, and store uploaded database files.
// Purpose: Append new immutable versions without ever reusing a version number.
// Dependencies: rand, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! An upload is validated before anything is written: the database name,
//! the size bounds, and a read-only open proving the bytes are a real
//! database with at least one table. The content digest is computed next.
//!
//! Version assignment, object-id allocation, the object write, and the
//! metadata insert run under a lock keyed by `(owner, name)`, so concurrent
//! uploads of one database are serialized while uploads of different
//! databases proceed in parallel. The metadata store's uniqueness constraint
//! backs the lock: a duplicate version fails as
//! [`TablehubError::VersionConflict`] instead of overwriting.
//!
//! Object ids are unique per bucket, which the per-database lock does not
//! cover. Object stores refuse to replace an existing object, and a write
//! that lands on a taken id draws a fresh id within the same attempt budget.
//!
//! Bytes are stored before metadata is inserted. A crash between the two
//! leaves an orphaned object and never a record pointing at nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rand::Rng;
use rand::rngs::OsRng;

use crate::core::audit::AuditSink;
use crate::core::audit::UploadAuditEvent;
use crate::core::audit::ValidationAuditEvent;
use crate::core::error::TablehubError;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::hash_bytes;
use crate::core::identifiers::BucketName;
use crate::core::identifiers::DatabaseName;
use crate::core::identifiers::IdentifierError;
use crate::core::identifiers::ObjectId;
use crate::core::identifiers::UserName;
use crate::core::identifiers::Version;
use crate::core::records::DatabaseRecord;
use crate::core::records::ROOT_FOLDER;
use crate::core::records::StorageLocator;
use crate::core::records::Visibility;
use crate::interfaces::MetadataStore;
use crate::interfaces::ObjectStore;
use crate::interfaces::ObjectStoreError;
use crate::interfaces::TableEngine;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Default maximum upload size (bytes).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;
/// Default number of object-id draws before giving up.
pub const DEFAULT_OBJECT_ID_ATTEMPTS: u32 = 16;
/// Content type recorded when the uploader supplies none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/x-sqlite3";

/// Upload limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSettings {
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
    /// Object-id draws before failing with [`TablehubError::StorageExhausted`].
    pub object_id_attempts: u32,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            object_id_attempts: DEFAULT_OBJECT_ID_ATTEMPTS,
        }
    }
}

/// One uploaded file.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    /// Authenticated uploader, who becomes the owner.
    pub owner: &'a UserName,
    /// Raw database name as supplied with the upload.
    pub database: &'a str,
    /// File bytes.
    pub bytes: &'a [u8],
    /// Requested visibility.
    pub visibility: Visibility,
    /// Declared content type, if any.
    pub content_type: Option<&'a str>,
}

// ============================================================================
// SECTION: Object Ids
// ============================================================================

/// Source of candidate object identifiers.
pub trait ObjectIdSource: Send + Sync {
    /// Returns a fresh candidate identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the generated identifier is invalid.
    fn next_id(&self) -> Result<ObjectId, IdentifierError>;
}

/// Random `[A-Za-z0-9]{8}.db` identifiers drawn from the OS RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomObjectIds;

/// Alphabet for random object identifiers.
const OBJECT_ID_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
/// Random characters per object identifier.
const OBJECT_ID_RANDOM_CHARS: usize = 8;

impl ObjectIdSource for RandomObjectIds {
    fn next_id(&self) -> Result<ObjectId, IdentifierError> {
        let mut rng = OsRng;
        let mut raw = String::with_capacity(OBJECT_ID_RANDOM_CHARS + 3);
        for _ in 0 .. OBJECT_ID_RANDOM_CHARS {
            let index = rng.gen_range(0 .. OBJECT_ID_ALPHABET.len());
            raw.push(char::from(OBJECT_ID_ALPHABET[index]));
        }
        raw.push_str(".db");
        ObjectId::parse(&raw)
    }
}

// ============================================================================
// SECTION: Version Locks
// ============================================================================

/// Per-database locks serializing version assignment.
#[derive(Debug, Default)]
struct VersionLocks {
    /// Lock slots keyed by database pair.
    slots: Mutex<HashMap<(UserName, DatabaseName), Arc<Mutex<()>>>>,
}

impl VersionLocks {
    /// Runs `f` while holding the lock for one database pair.
    fn with_lock<T>(
        &self,
        owner: &UserName,
        name: &DatabaseName,
        f: impl FnOnce() -> Result<T, TablehubError>,
    ) -> Result<T, TablehubError> {
        let key = (owner.clone(), name.clone());
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        let result = {
            let _held = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&slot) == 2 {
            slots.remove(&key);
        }
        result
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Upload pipeline appending new database versions.
pub struct UploadPipeline {
    /// Metadata backend.
    metadata: Arc<dyn MetadataStore>,
    /// Object backend.
    objects: Arc<dyn ObjectStore>,
    /// Engine used for the upload sanity check.
    engine: Arc<dyn TableEngine>,
    /// Object identifier source.
    ids: Arc<dyn ObjectIdSource>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Upload limits.
    settings: UploadSettings,
    /// Per-database version locks.
    locks: VersionLocks,
}

impl UploadPipeline {
    /// Creates a pipeline with random object identifiers.
    #[must_use]
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        objects: Arc<dyn ObjectStore>,
        engine: Arc<dyn TableEngine>,
        audit: Arc<dyn AuditSink>,
        settings: UploadSettings,
    ) -> Self {
        Self::with_id_source(metadata, objects, engine, audit, settings, Arc::new(RandomObjectIds))
    }

    /// Creates a pipeline with an explicit object identifier source.
    #[must_use]
    pub fn with_id_source(
        metadata: Arc<dyn MetadataStore>,
        objects: Arc<dyn ObjectStore>,
        engine: Arc<dyn TableEngine>,
        audit: Arc<dyn AuditSink>,
        settings: UploadSettings,
        ids: Arc<dyn ObjectIdSource>,
    ) -> Self {
        Self {
            metadata,
            objects,
            engine,
            ids,
            audit,
            settings,
            locks: VersionLocks::default(),
        }
    }

    /// Validates and stores an upload as the next version of its database.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError::InvalidName`], [`TablehubError::EmptyUpload`],
    /// [`TablehubError::InvalidFormat`] (oversized), or
    /// [`TablehubError::NotADatabase`] before anything is stored;
    /// [`TablehubError::StorageExhausted`] when no free object id is found;
    /// and storage or [`TablehubError::VersionConflict`] errors from the
    /// backends.
    pub fn upload(&self, request: &UploadRequest<'_>) -> Result<DatabaseRecord, TablehubError> {
        let name = DatabaseName::parse(request.database).map_err(|err| {
            self.audit.record_validation(&ValidationAuditEvent::from_error(&err));
            TablehubError::InvalidName(err.to_string())
        })?;
        if request.bytes.is_empty() {
            return Err(TablehubError::EmptyUpload);
        }
        if request.bytes.len() > self.settings.max_upload_bytes {
            return Err(TablehubError::InvalidFormat(format!(
                "upload exceeds size limit: {} bytes (max {})",
                request.bytes.len(),
                self.settings.max_upload_bytes
            )));
        }
        match self.engine.inspect(request.bytes) {
            Ok(tables) if tables.is_empty() => {
                return Err(TablehubError::NotADatabase("database contains no tables".to_string()));
            }
            Ok(_) => {}
            Err(err) => return Err(TablehubError::NotADatabase(err.to_string())),
        }
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, request.bytes);
        let bucket = BucketName::for_owner(request.owner);
        let content_type = request.content_type.unwrap_or(DEFAULT_CONTENT_TYPE);

        let record = self.locks.with_lock(request.owner, &name, || {
            let version = match self.metadata.highest_version(request.owner, &name)? {
                None => Version::FIRST,
                Some(highest) => highest.next().ok_or_else(|| {
                    TablehubError::Internal(format!("version space exhausted for {name}"))
                })?,
            };
            let (object_id, size_bytes) =
                self.store_object(&bucket, request.bytes, content_type)?;
            let record = DatabaseRecord {
                owner: request.owner.clone(),
                name: name.clone(),
                folder: ROOT_FOLDER.to_string(),
                version,
                digest,
                size_bytes,
                visibility: request.visibility,
                locator: StorageLocator::new(bucket.clone(), object_id),
                created_at_ms: unix_millis(),
            };
            self.metadata.insert_record(&record)?;
            Ok(record)
        })?;
        self.audit.record_upload(&UploadAuditEvent::from_record(&record));
        Ok(record)
    }

    /// Draws object identifiers until one is stored under an unused id.
    fn store_object(
        &self,
        bucket: &BucketName,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(ObjectId, u64), TablehubError> {
        for _ in 0 .. self.settings.object_id_attempts {
            let candidate =
                self.ids.next_id().map_err(|err| TablehubError::Internal(err.to_string()))?;
            if self.metadata.object_id_in_use(bucket, &candidate)? {
                continue;
            }
            match self.objects.store(bucket, &candidate, bytes, Some(content_type)) {
                Ok(size_bytes) => return Ok((candidate, size_bytes)),
                Err(ObjectStoreError::Exists(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Err(TablehubError::StorageExhausted)
    }
}

/// Returns the current time in milliseconds since the Unix epoch.
fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
