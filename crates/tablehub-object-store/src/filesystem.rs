// crates/tablehub-object-store/src/filesystem.rs
// ============================================================================
// Module: Filesystem Object Store
// Description: ObjectStore backed by a local directory tree.
// Purpose: Persist immutable database objects on local disk.
// Dependencies: tablehub-core, tempfile
// ============================================================================

//! ## Overview
//! Objects live at `root/bucket/object_id`. Writes go to a temp file in the
//! bucket directory, are synced, and then renamed into place without
//! replacing an existing object, so readers never observe a partial file.
//! Reads are bounded by the configured maximum object size.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tablehub_core::BucketName;
use tablehub_core::ObjectHandle;
use tablehub_core::ObjectId;
use tablehub_core::ObjectStore;
use tablehub_core::ObjectStoreError;
use tablehub_core::StorageLocator;
use tempfile::NamedTempFile;

use crate::keys::locator_key;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FilesystemObjectStore {
    /// Root directory holding one subdirectory per bucket.
    root: PathBuf,
    /// Maximum object size accepted on read and write.
    max_object_bytes: usize,
}

impl FilesystemObjectStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Unavailable`] when the root cannot be
    /// created and [`ObjectStoreError::Invalid`] when it is not a directory.
    pub fn new(root: impl Into<PathBuf>, max_object_bytes: usize) -> Result<Self, ObjectStoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| ObjectStoreError::Unavailable(err.to_string()))?;
        if !root.is_dir() {
            return Err(ObjectStoreError::Invalid("object root must be a directory".to_string()));
        }
        Ok(Self {
            root,
            max_object_bytes,
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the on-disk path for a locator.
    fn object_path(&self, locator: &StorageLocator) -> Result<PathBuf, ObjectStoreError> {
        Ok(self.root.join(locator_key(locator)?))
    }

    /// Fails when a size exceeds the configured limit.
    fn check_size(&self, actual_bytes: u64) -> Result<(), ObjectStoreError> {
        let max = u64::try_from(self.max_object_bytes).unwrap_or(u64::MAX);
        if actual_bytes > max {
            return Err(ObjectStoreError::TooLarge {
                max_bytes: self.max_object_bytes,
                actual_bytes,
            });
        }
        Ok(())
    }
}

impl ObjectStore for FilesystemObjectStore {
    fn open_for_read(&self, locator: &StorageLocator) -> Result<ObjectHandle, ObjectStoreError> {
        let path = self.object_path(locator)?;
        let file = File::open(&path).map_err(|err| io_error(&err, &path))?;
        let length = file.metadata().map_err(|err| io_error(&err, &path))?.len();
        self.check_size(length)?;
        let limit = u64::try_from(self.max_object_bytes).unwrap_or(u64::MAX).saturating_add(1);
        let mut bytes = Vec::new();
        file.take(limit).read_to_end(&mut bytes).map_err(|err| io_error(&err, &path))?;
        self.check_size(u64::try_from(bytes.len()).unwrap_or(u64::MAX))?;
        Ok(ObjectHandle::new(locator.clone(), bytes))
    }

    fn store(
        &self,
        bucket: &BucketName,
        object_id: &ObjectId,
        bytes: &[u8],
        _content_type: Option<&str>,
    ) -> Result<u64, ObjectStoreError> {
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        self.check_size(size)?;
        let locator = StorageLocator::new(bucket.clone(), object_id.clone());
        let path = self.object_path(&locator)?;
        let Some(dir) = path.parent() else {
            return Err(ObjectStoreError::Invalid("object path missing parent".to_string()));
        };
        fs::create_dir_all(dir).map_err(|err| io_error(&err, dir))?;
        let mut temp = NamedTempFile::new_in(dir).map_err(|err| io_error(&err, dir))?;
        temp.write_all(bytes).map_err(|err| io_error(&err, &path))?;
        temp.as_file().sync_all().map_err(|err| io_error(&err, &path))?;
        temp.persist_noclobber(&path).map_err(|err| {
            if err.error.kind() == ErrorKind::AlreadyExists {
                ObjectStoreError::Exists(locator_key_lossy(&locator))
            } else {
                io_error(&err.error, &path)
            }
        })?;
        Ok(size)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps an I/O error, reporting absent files as missing objects.
fn io_error(err: &std::io::Error, path: &Path) -> ObjectStoreError {
    if err.kind() == ErrorKind::NotFound {
        ObjectStoreError::Missing(path.display().to_string())
    } else {
        ObjectStoreError::Unavailable(format!("{}: {err}", path.display()))
    }
}

/// Formats a locator for messages.
fn locator_key_lossy(locator: &StorageLocator) -> String {
    format!("{}/{}", locator.bucket, locator.object_id)
}
