// crates/tablehub-object-store/src/lib.rs
// ============================================================================
// Module: Tablehub Object Store Library
// Description: Durable ObjectStore backends for uploaded database files.
// Purpose: Store immutable database objects on local disk or in S3.
// Dependencies: tablehub-core, tablehub-config, aws-sdk-s3, tempfile, tokio
// ============================================================================

//! ## Overview
//! Two [`tablehub_core::ObjectStore`] backends are provided. The filesystem
//! backend writes each object atomically through a temp file renamed into
//! `root/bucket/object_id`. The S3 backend stores every tablehub bucket as a
//! key segment inside one configured S3 bucket. Both bound reads by the
//! configured maximum object size and reject keys that could escape their
//! root. [`build_object_store`] wires the backend named by configuration.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod filesystem;
pub mod keys;
pub mod s3;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use filesystem::FilesystemObjectStore;
pub use s3::S3ObjectStore;

// ============================================================================
// SECTION: Wiring
// ============================================================================

use std::sync::Arc;

use tablehub_config::ObjectStoreConfig;
use tablehub_config::ObjectStoreProvider;
use tablehub_core::ObjectStore;
use tablehub_core::ObjectStoreError;

/// Builds the object store selected by configuration.
///
/// # Errors
///
/// Returns [`ObjectStoreError`] when configuration is invalid or the backend
/// cannot be initialized.
pub fn build_object_store(
    config: &ObjectStoreConfig,
) -> Result<Arc<dyn ObjectStore>, ObjectStoreError> {
    config.validate().map_err(|err| ObjectStoreError::Invalid(err.to_string()))?;
    let store: Arc<dyn ObjectStore> = match config.provider {
        ObjectStoreProvider::Filesystem => Arc::new(FilesystemObjectStore::new(
            config.filesystem_root(),
            config.max_object_bytes,
        )?),
        ObjectStoreProvider::S3 => Arc::new(S3ObjectStore::new(config)?),
    };
    Ok(store)
}
