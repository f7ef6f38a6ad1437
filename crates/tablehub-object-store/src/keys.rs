// crates/tablehub-object-store/src/keys.rs
// ============================================================================
// Module: Object Keys
// Description: Key derivation and validation for stored objects.
// Purpose: Keep every object key relative and inside its backend root.
// Dependencies: tablehub-core
// ============================================================================

//! ## Overview
//! Storage locators are already validated identifiers, but backends treat
//! them as untrusted: every segment is re-checked before it becomes a path
//! or key, so a locator can never traverse out of the configured root.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Component;
use std::path::Path;

use tablehub_core::ObjectStoreError;
use tablehub_core::StorageLocator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a single key segment.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total key length.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the `bucket/object_id` key for a locator.
///
/// # Errors
///
/// Returns [`ObjectStoreError::Invalid`] when a segment is unsafe.
pub fn locator_key(locator: &StorageLocator) -> Result<String, ObjectStoreError> {
    let bucket = locator.bucket.as_str();
    let object_id = locator.object_id.as_str();
    validate_segment(bucket)?;
    validate_segment(object_id)?;
    Ok(format!("{bucket}/{object_id}"))
}

/// Normalizes a root prefix to either empty or `segment/.../`.
///
/// # Errors
///
/// Returns [`ObjectStoreError::Invalid`] for absolute or traversing prefixes.
pub fn normalize_prefix(raw: &str) -> Result<String, ObjectStoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if trimmed.starts_with('/') {
        return Err(ObjectStoreError::Invalid(
            "prefix must be relative (no leading slash)".to_string(),
        ));
    }
    let normalized = trimmed.strip_suffix('/').unwrap_or(trimmed);
    validate_relative_path(normalized)?;
    Ok(format!("{normalized}/"))
}

/// Validates a relative path string.
fn validate_relative_path(path: &str) -> Result<(), ObjectStoreError> {
    if path.contains('\\') {
        return Err(ObjectStoreError::Invalid("path must not contain backslashes".to_string()));
    }
    if path.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ObjectStoreError::Invalid("path exceeds length limit".to_string()));
    }
    for component in Path::new(path).components() {
        match component {
            Component::Normal(value) => validate_segment(&value.to_string_lossy())?,
            _ => {
                return Err(ObjectStoreError::Invalid(
                    "path must be relative without traversal".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Validates a single path segment.
///
/// # Errors
///
/// Returns [`ObjectStoreError::Invalid`] for empty, dot, or separator-bearing
/// segments.
pub fn validate_segment(value: &str) -> Result<(), ObjectStoreError> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(ObjectStoreError::Invalid("segment is invalid".to_string()));
    }
    if value.len() > MAX_PATH_COMPONENT_LENGTH {
        return Err(ObjectStoreError::Invalid("segment exceeds length limit".to_string()));
    }
    if value.contains(['/', '\\', '\0']) {
        return Err(ObjectStoreError::Invalid("segment contains invalid characters".to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
