// crates/tablehub-core/src/runtime/resolver.rs
// ============================================================================
// Module: Tablehub Version Resolver
// Description: Resolve database versions to storage locators.
// Purpose: Enforce visibility before any object-store access happens.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The resolver maps `(owner, database, version selector, requester)` to the
//! record of one stored version. It reads metadata only and never touches the
//! object store.
//!
//! Visibility is checked against the latest record before the requested
//! version is looked up, so a refused requester learns nothing about which
//! versions exist. An older version is then checked against its own flag,
//! since visibility is recorded per version. Owner comparison is exact and case-sensitive; anonymous
//! requesters never match an owner.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::error::TablehubError;
use crate::core::identifiers::DatabaseName;
use crate::core::identifiers::Requester;
use crate::core::identifiers::UserName;
use crate::core::identifiers::VersionSelector;
use crate::core::records::DatabaseRecord;
use crate::core::records::StorageLocator;
use crate::interfaces::MetadataStore;

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Metadata-only resolver from version selectors to stored records.
#[derive(Clone)]
pub struct VersionResolver {
    /// Metadata backend.
    metadata: Arc<dyn MetadataStore>,
}

impl VersionResolver {
    /// Creates a resolver over a metadata store.
    #[must_use]
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            metadata,
        }
    }

    /// Resolves a version selector to a storage locator.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError::NotFound`] when the database has no versions,
    /// [`TablehubError::AccessDenied`] when a private database is requested
    /// by anyone but its owner, and [`TablehubError::VersionNotFound`] when
    /// the exact version is not stored.
    pub fn resolve(
        &self,
        owner: &UserName,
        database: &DatabaseName,
        selector: VersionSelector,
        requester: &Requester,
    ) -> Result<StorageLocator, TablehubError> {
        self.resolve_record(owner, database, selector, requester).map(|record| record.locator)
    }

    /// Resolves a version selector to its full record.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`VersionResolver::resolve`].
    pub fn resolve_record(
        &self,
        owner: &UserName,
        database: &DatabaseName,
        selector: VersionSelector,
        requester: &Requester,
    ) -> Result<DatabaseRecord, TablehubError> {
        let latest = self.metadata.highest_version(owner, database)?.ok_or(TablehubError::NotFound)?;
        let latest_record =
            self.metadata.record(owner, database, latest)?.ok_or_else(|| {
                TablehubError::Internal(format!(
                    "highest version {latest} of {owner}/{database} has no record"
                ))
            })?;
        if !latest_record.readable_by(requester) {
            return Err(TablehubError::AccessDenied);
        }
        match selector {
            VersionSelector::Latest => Ok(latest_record),
            VersionSelector::Exact(version) if version == latest => Ok(latest_record),
            VersionSelector::Exact(version) => {
                let record = self
                    .metadata
                    .record(owner, database, version)?
                    .ok_or(TablehubError::VersionNotFound)?;
                if !record.readable_by(requester) {
                    return Err(TablehubError::AccessDenied);
                }
                Ok(record)
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;
    use crate::core::hashing::HashAlgorithm;
    use crate::core::hashing::hash_bytes;
    use crate::core::identifiers::BucketName;
    use crate::core::identifiers::ObjectId;
    use crate::core::identifiers::Version;
    use crate::core::records::ROOT_FOLDER;
    use crate::core::records::Visibility;
    use crate::runtime::store::InMemoryMetadataStore;

    fn seed(store: &InMemoryMetadataStore, versions: u32, visibility: Visibility) {
        for version in 1 ..= versions {
            seed_version(store, version, visibility);
        }
    }

    fn seed_version(store: &InMemoryMetadataStore, version: u32, visibility: Visibility) {
        let owner = UserName::parse("alice").unwrap();
        store
            .insert_record(&DatabaseRecord {
                owner: owner.clone(),
                name: DatabaseName::parse("a.db").unwrap(),
                folder: ROOT_FOLDER.to_string(),
                version: Version::new(version).unwrap(),
                digest: hash_bytes(HashAlgorithm::Sha256, &version.to_be_bytes()),
                size_bytes: 4,
                visibility,
                locator: StorageLocator::new(
                    BucketName::for_owner(&owner),
                    ObjectId::parse(&format!("obj{version:05}.db")).unwrap(),
                ),
                created_at_ms: 0,
            })
            .unwrap();
    }

    fn names() -> (UserName, DatabaseName) {
        (UserName::parse("alice").unwrap(), DatabaseName::parse("a.db").unwrap())
    }

    #[test]
    fn latest_resolves_to_highest_version() {
        let store = InMemoryMetadataStore::new();
        seed(&store, 3, Visibility::Public);
        let resolver = VersionResolver::new(Arc::new(store));
        let (owner, name) = names();
        let latest = resolver
            .resolve_record(&owner, &name, VersionSelector::Latest, &Requester::Anonymous)
            .unwrap();
        assert_eq!(latest.version.get(), 3);
        let exact = resolver
            .resolve_record(&owner, &name, VersionSelector::from_number(3), &Requester::Anonymous)
            .unwrap();
        assert_eq!(exact, latest);
    }

    #[test]
    fn missing_version_is_reported_after_access_check() {
        let store = InMemoryMetadataStore::new();
        seed(&store, 3, Visibility::Public);
        let resolver = VersionResolver::new(Arc::new(store));
        let (owner, name) = names();
        let err = resolver
            .resolve(&owner, &name, VersionSelector::from_number(5), &Requester::Anonymous)
            .unwrap_err();
        assert_eq!(err, TablehubError::VersionNotFound);
    }

    #[test]
    fn private_databases_hide_version_existence() {
        let store = InMemoryMetadataStore::new();
        seed(&store, 2, Visibility::Private);
        let resolver = VersionResolver::new(Arc::new(store));
        let (owner, name) = names();
        let bob = Requester::User(UserName::parse("bob").unwrap());
        for selector in [VersionSelector::Latest, VersionSelector::from_number(9)] {
            let err = resolver.resolve(&owner, &name, selector, &bob).unwrap_err();
            assert_eq!(err, TablehubError::AccessDenied);
        }
        let upper = Requester::User(UserName::parse("ALICE").unwrap());
        assert_eq!(
            resolver.resolve(&owner, &name, VersionSelector::Latest, &upper).unwrap_err(),
            TablehubError::AccessDenied
        );
        assert!(
            resolver
                .resolve(&owner, &name, VersionSelector::Latest, &Requester::User(owner.clone()))
                .is_ok()
        );
    }

    #[test]
    fn unknown_database_is_not_found() {
        let resolver = VersionResolver::new(Arc::new(InMemoryMetadataStore::new()));
        let (owner, name) = names();
        let err =
            resolver.resolve(&owner, &name, VersionSelector::Latest, &Requester::Anonymous).unwrap_err();
        assert_eq!(err, TablehubError::NotFound);
    }

    #[test]
    fn private_older_version_stays_hidden_under_public_latest() {
        let store = InMemoryMetadataStore::new();
        seed_version(&store, 1, Visibility::Private);
        seed_version(&store, 2, Visibility::Public);
        let resolver = VersionResolver::new(Arc::new(store));
        let (owner, name) = names();
        let bob = Requester::User(UserName::parse("bob").unwrap());
        for requester in [&bob, &Requester::Anonymous] {
            let err = resolver
                .resolve(&owner, &name, VersionSelector::from_number(1), requester)
                .unwrap_err();
            assert_eq!(err, TablehubError::AccessDenied);
            let latest =
                resolver.resolve_record(&owner, &name, VersionSelector::Latest, requester).unwrap();
            assert_eq!(latest.version.get(), 2);
        }
        let alice = Requester::User(owner.clone());
        let old = resolver
            .resolve_record(&owner, &name, VersionSelector::from_number(1), &alice)
            .unwrap();
        assert_eq!(old.visibility, Visibility::Private);
    }

    #[test]
    fn private_latest_hides_public_older_versions() {
        let store = InMemoryMetadataStore::new();
        seed_version(&store, 1, Visibility::Public);
        seed_version(&store, 2, Visibility::Private);
        let resolver = VersionResolver::new(Arc::new(store));
        let (owner, name) = names();
        let err = resolver
            .resolve(&owner, &name, VersionSelector::from_number(1), &Requester::Anonymous)
            .unwrap_err();
        assert_eq!(err, TablehubError::AccessDenied);
        let alice = Requester::User(owner.clone());
        for version in [1, 2] {
            assert!(
                resolver
                    .resolve(&owner, &name, VersionSelector::from_number(version), &alice)
                    .is_ok()
            );
        }
    }
}
