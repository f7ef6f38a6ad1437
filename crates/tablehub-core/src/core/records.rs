// crates/tablehub-core/src/core/records.rs
// ============================================================================
// Module: Tablehub Metadata Records
// Description: Version records linking database names to stored objects.
// Purpose: Carry the metadata needed to resolve, authorize, and locate versions.
// Dependencies: serde, crate::core::{hashing, identifiers}
// ============================================================================

//! ## Overview
//! A [`DatabaseRecord`] describes one immutable version of one database. The
//! triple `(owner, name, version)` is unique, versions for a pair are dense
//! starting at 1, and the [`StorageLocator`] of a record is never shared with
//! another record.
//!
//! Visibility is a property of the database pair rather than of a single
//! version; stores apply visibility changes to every version at once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::BucketName;
use crate::core::identifiers::DatabaseName;
use crate::core::identifiers::ObjectId;
use crate::core::identifiers::Requester;
use crate::core::identifiers::UserName;
use crate::core::identifiers::Version;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Folder recorded for every uploaded database.
pub const ROOT_FOLDER: &str = "/";

// ============================================================================
// SECTION: Visibility
// ============================================================================

/// Who may read a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Readable by anyone, including anonymous requesters.
    Public,
    /// Readable only by the owner.
    Private,
}

impl Visibility {
    /// Returns a stable label for the visibility.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    /// Parses a stable label produced by [`Visibility::as_str`].
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }

    /// Builds a visibility from the upload form's public flag.
    #[must_use]
    pub const fn from_public_flag(public: bool) -> Self {
        if public { Self::Public } else { Self::Private }
    }
}

// ============================================================================
// SECTION: Storage Locator
// ============================================================================

/// Bucket and object identifier of a stored database file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageLocator {
    /// Bucket holding the object.
    pub bucket: BucketName,
    /// Object identifier within the bucket.
    pub object_id: ObjectId,
}

impl StorageLocator {
    /// Creates a new locator.
    #[must_use]
    pub const fn new(bucket: BucketName, object_id: ObjectId) -> Self {
        Self {
            bucket,
            object_id,
        }
    }
}

// ============================================================================
// SECTION: Database Record
// ============================================================================

/// Metadata for one stored version of a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRecord {
    /// Owning user.
    pub owner: UserName,
    /// Database name.
    pub name: DatabaseName,
    /// Folder path, always [`ROOT_FOLDER`].
    pub folder: String,
    /// Version number.
    pub version: Version,
    /// Content digest of the stored file.
    pub digest: HashDigest,
    /// Stored file size in bytes.
    pub size_bytes: u64,
    /// Visibility of the database pair.
    pub visibility: Visibility,
    /// Location of the stored file.
    pub locator: StorageLocator,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at_ms: u64,
}

impl DatabaseRecord {
    /// Returns true when the requester may read this database.
    #[must_use]
    pub fn readable_by(&self, requester: &Requester) -> bool {
        self.visibility == Visibility::Public || requester.is(&self.owner)
    }
}

// ============================================================================
// SECTION: Listing
// ============================================================================

/// Summary row for a database listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSummary {
    /// Owning user.
    pub owner: UserName,
    /// Database name.
    pub name: DatabaseName,
    /// Latest version number.
    pub latest_version: Version,
    /// Size of the latest version in bytes.
    pub size_bytes: u64,
    /// Visibility of the database pair.
    pub visibility: Visibility,
    /// Number of users who starred the database.
    pub stars: u64,
}
