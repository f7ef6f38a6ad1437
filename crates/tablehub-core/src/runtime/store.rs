// crates/tablehub-core/src/runtime/store.rs
// ============================================================================
// Module: Tablehub In-Memory Stores
// Description: In-memory metadata and object stores for tests and demos.
// Purpose: Provide deterministic backends without external dependencies.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides in-memory implementations of [`MetadataStore`] and
//! [`ObjectStore`] for tests and local demos. They enforce the same
//! uniqueness rules as the persistent backends but are not intended for
//! production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::btree_map::Entry;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::core::identifiers::BucketName;
use crate::core::identifiers::DatabaseName;
use crate::core::identifiers::ObjectId;
use crate::core::identifiers::UserName;
use crate::core::identifiers::Version;
use crate::core::records::DatabaseRecord;
use crate::core::records::StorageLocator;
use crate::core::records::Visibility;
use crate::interfaces::MetadataError;
use crate::interfaces::MetadataStore;
use crate::interfaces::ObjectHandle;
use crate::interfaces::ObjectStore;
use crate::interfaces::ObjectStoreError;

// ============================================================================
// SECTION: In-Memory Metadata Store
// ============================================================================

/// Key of a database pair.
type DatabaseKey = (UserName, DatabaseName);

/// Metadata state guarded by one mutex.
#[derive(Debug, Default)]
struct MetadataState {
    /// Version records per database pair.
    records: BTreeMap<DatabaseKey, BTreeMap<Version, DatabaseRecord>>,
    /// Storage locators already claimed by a record.
    locators: BTreeSet<(String, String)>,
    /// Users who starred each database pair.
    stars: BTreeMap<DatabaseKey, BTreeSet<UserName>>,
    /// Per-user row cap preferences.
    max_rows: BTreeMap<UserName, u32>,
}

/// In-memory metadata store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMetadataStore {
    /// Metadata state protected by a mutex.
    state: Arc<Mutex<MetadataState>>,
}

impl InMemoryMetadataStore {
    /// Creates a new, empty in-memory metadata store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state, mapping poisoning to a store error.
    fn lock(&self) -> Result<MutexGuard<'_, MetadataState>, MetadataError> {
        self.state
            .lock()
            .map_err(|_| MetadataError::Unavailable("metadata store mutex poisoned".to_string()))
    }
}

/// Builds the map key for a database pair.
fn database_key(owner: &UserName, name: &DatabaseName) -> DatabaseKey {
    (owner.clone(), name.clone())
}

/// Builds the claim key for a storage locator.
fn locator_key(bucket: &BucketName, object_id: &ObjectId) -> (String, String) {
    (bucket.to_string(), object_id.to_string())
}

impl MetadataStore for InMemoryMetadataStore {
    fn highest_version(
        &self,
        owner: &UserName,
        name: &DatabaseName,
    ) -> Result<Option<Version>, MetadataError> {
        let guard = self.lock()?;
        Ok(guard
            .records
            .get(&database_key(owner, name))
            .and_then(|versions| versions.keys().next_back().copied()))
    }

    fn record(
        &self,
        owner: &UserName,
        name: &DatabaseName,
        version: Version,
    ) -> Result<Option<DatabaseRecord>, MetadataError> {
        let guard = self.lock()?;
        Ok(guard
            .records
            .get(&database_key(owner, name))
            .and_then(|versions| versions.get(&version))
            .cloned())
    }

    fn insert_record(&self, record: &DatabaseRecord) -> Result<(), MetadataError> {
        let mut guard = self.lock()?;
        let claim = locator_key(&record.locator.bucket, &record.locator.object_id);
        if guard.locators.contains(&claim) {
            return Err(MetadataError::Conflict(format!(
                "storage locator already recorded: {}/{}",
                claim.0, claim.1
            )));
        }
        let versions = guard.records.entry(database_key(&record.owner, &record.name)).or_default();
        if versions.contains_key(&record.version) {
            return Err(MetadataError::Conflict(format!(
                "version {} of {}/{} already recorded",
                record.version, record.owner, record.name
            )));
        }
        versions.insert(record.version, record.clone());
        guard.locators.insert(claim);
        Ok(())
    }

    fn set_visibility(
        &self,
        owner: &UserName,
        name: &DatabaseName,
        visibility: Visibility,
    ) -> Result<(), MetadataError> {
        let mut guard = self.lock()?;
        let versions = guard
            .records
            .get_mut(&database_key(owner, name))
            .ok_or_else(|| MetadataError::Missing(format!("{owner}/{name}")))?;
        for record in versions.values_mut() {
            record.visibility = visibility;
        }
        Ok(())
    }

    fn object_id_in_use(
        &self,
        bucket: &BucketName,
        object_id: &ObjectId,
    ) -> Result<bool, MetadataError> {
        let guard = self.lock()?;
        Ok(guard.locators.contains(&locator_key(bucket, object_id)))
    }

    fn list_databases(&self, owner: &UserName) -> Result<Vec<DatabaseRecord>, MetadataError> {
        let guard = self.lock()?;
        Ok(guard
            .records
            .iter()
            .filter(|((record_owner, _), _)| record_owner == owner)
            .filter_map(|(_, versions)| versions.values().next_back().cloned())
            .collect())
    }

    fn toggle_star(
        &self,
        user: &UserName,
        owner: &UserName,
        name: &DatabaseName,
    ) -> Result<bool, MetadataError> {
        let mut guard = self.lock()?;
        let key = database_key(owner, name);
        if !guard.records.contains_key(&key) {
            return Err(MetadataError::Missing(format!("{owner}/{name}")));
        }
        let stars = guard.stars.entry(key).or_default();
        if stars.remove(user) {
            Ok(false)
        } else {
            stars.insert(user.clone());
            Ok(true)
        }
    }

    fn star_count(&self, owner: &UserName, name: &DatabaseName) -> Result<u64, MetadataError> {
        let guard = self.lock()?;
        Ok(guard.stars.get(&database_key(owner, name)).map_or(0, |stars| stars.len() as u64))
    }

    fn stargazers(
        &self,
        owner: &UserName,
        name: &DatabaseName,
    ) -> Result<Vec<UserName>, MetadataError> {
        let guard = self.lock()?;
        Ok(guard
            .stars
            .get(&database_key(owner, name))
            .map(|stars| stars.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn user_max_rows(&self, user: &UserName) -> Result<Option<u32>, MetadataError> {
        let guard = self.lock()?;
        Ok(guard.max_rows.get(user).copied())
    }

    fn set_user_max_rows(&self, user: &UserName, max_rows: u32) -> Result<(), MetadataError> {
        let mut guard = self.lock()?;
        guard.max_rows.insert(user.clone(), max_rows);
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Object Store
// ============================================================================

/// Default maximum object size for the in-memory store (bytes).
const DEFAULT_MAX_OBJECT_BYTES: usize = 512 * 1024 * 1024;

/// In-memory object store for tests and examples.
#[derive(Debug, Clone)]
pub struct InMemoryObjectStore {
    /// Object bytes keyed by bucket and object identifier.
    objects: Arc<Mutex<BTreeMap<(String, String), Arc<Vec<u8>>>>>,
    /// When set, every operation fails as unavailable.
    unavailable: Arc<AtomicBool>,
    /// Maximum object size in bytes.
    max_object_bytes: usize,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    /// Creates a new in-memory object store with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_object_bytes(DEFAULT_MAX_OBJECT_BYTES)
    }

    /// Creates a new in-memory object store with an explicit size limit.
    #[must_use]
    pub fn with_max_object_bytes(max_object_bytes: usize) -> Self {
        Self {
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            unavailable: Arc::new(AtomicBool::new(false)),
            max_object_bytes,
        }
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    /// Returns true when no objects are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes an object, simulating loss in the backing store.
    #[must_use]
    pub fn remove(&self, locator: &StorageLocator) -> bool {
        self.objects
            .lock()
            .map(|mut objects| {
                objects.remove(&locator_key(&locator.bucket, &locator.object_id)).is_some()
            })
            .unwrap_or(false)
    }

    /// Simulates a backend outage until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fails when an outage is being simulated.
    fn check_available(&self) -> Result<(), ObjectStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Unavailable("object store offline".to_string()));
        }
        Ok(())
    }

    /// Locks the object map, mapping poisoning to a store error.
    fn lock(
        &self,
    ) -> Result<MutexGuard<'_, BTreeMap<(String, String), Arc<Vec<u8>>>>, ObjectStoreError> {
        self.objects
            .lock()
            .map_err(|_| ObjectStoreError::Unavailable("object store mutex poisoned".to_string()))
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn open_for_read(&self, locator: &StorageLocator) -> Result<ObjectHandle, ObjectStoreError> {
        self.check_available()?;
        let guard = self.lock()?;
        let bytes = guard
            .get(&locator_key(&locator.bucket, &locator.object_id))
            .ok_or_else(|| {
                ObjectStoreError::Missing(format!("{}/{}", locator.bucket, locator.object_id))
            })?;
        Ok(ObjectHandle::new(locator.clone(), bytes.as_ref().clone()))
    }

    fn store(
        &self,
        bucket: &BucketName,
        object_id: &ObjectId,
        bytes: &[u8],
        _content_type: Option<&str>,
    ) -> Result<u64, ObjectStoreError> {
        self.check_available()?;
        if bytes.len() > self.max_object_bytes {
            return Err(ObjectStoreError::TooLarge {
                max_bytes: self.max_object_bytes,
                actual_bytes: bytes.len() as u64,
            });
        }
        let mut guard = self.lock()?;
        match guard.entry(locator_key(bucket, object_id)) {
            Entry::Occupied(_) => Err(ObjectStoreError::Exists(format!("{bucket}/{object_id}"))),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(bytes.to_vec()));
                Ok(bytes.len() as u64)
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
    use crate::core::records::ROOT_FOLDER;

    fn record(version: u32, object_id: &str) -> DatabaseRecord {
        let owner = UserName::parse("alice").unwrap();
        DatabaseRecord {
            owner: owner.clone(),
            name: DatabaseName::parse("a.db").unwrap(),
            folder: ROOT_FOLDER.to_string(),
            version: Version::new(version).unwrap(),
            digest: hash_bytes(HashAlgorithm::Sha256, b"x"),
            size_bytes: 1,
            visibility: Visibility::Public,
            locator: StorageLocator::new(
                BucketName::for_owner(&owner),
                ObjectId::parse(object_id).unwrap(),
            ),
            created_at_ms: 0,
        }
    }

    #[test]
    fn duplicate_versions_and_locators_conflict() {
        let store = InMemoryMetadataStore::new();
        store.insert_record(&record(1, "aaaaaaaa.db")).unwrap();
        assert!(matches!(
            store.insert_record(&record(1, "bbbbbbbb.db")),
            Err(MetadataError::Conflict(_))
        ));
        assert!(matches!(
            store.insert_record(&record(2, "aaaaaaaa.db")),
            Err(MetadataError::Conflict(_))
        ));
        store.insert_record(&record(2, "bbbbbbbb.db")).unwrap();
        let first = record(1, "aaaaaaaa.db");
        assert_eq!(store.highest_version(&first.owner, &first.name).unwrap(), Version::new(2));
    }

    #[test]
    fn visibility_applies_to_every_version() {
        let store = InMemoryMetadataStore::new();
        store.insert_record(&record(1, "aaaaaaaa.db")).unwrap();
        store.insert_record(&record(2, "bbbbbbbb.db")).unwrap();
        let sample = record(1, "aaaaaaaa.db");
        store.set_visibility(&sample.owner, &sample.name, Visibility::Private).unwrap();
        for version in [1, 2] {
            let stored =
                store.record(&sample.owner, &sample.name, Version::new(version).unwrap()).unwrap();
            assert_eq!(stored.unwrap().visibility, Visibility::Private);
        }
    }

    #[test]
    fn stars_toggle_on_and_off() {
        let store = InMemoryMetadataStore::new();
        let sample = record(1, "aaaaaaaa.db");
        store.insert_record(&sample).unwrap();
        let bob = UserName::parse("bob").unwrap();
        assert!(store.toggle_star(&bob, &sample.owner, &sample.name).unwrap());
        assert_eq!(store.star_count(&sample.owner, &sample.name).unwrap(), 1);
        assert!(!store.toggle_star(&bob, &sample.owner, &sample.name).unwrap());
        assert_eq!(store.star_count(&sample.owner, &sample.name).unwrap(), 0);
    }

    #[test]
    fn object_store_reports_missing_and_outages() {
        let objects = InMemoryObjectStore::new();
        let locator = record(1, "aaaaaaaa.db").locator;
        assert!(matches!(objects.open_for_read(&locator), Err(ObjectStoreError::Missing(_))));
        objects.store(&locator.bucket, &locator.object_id, b"abc", None).unwrap();
        assert_eq!(objects.open_for_read(&locator).unwrap().bytes(), b"abc");
        assert!(matches!(
            objects.store(&locator.bucket, &locator.object_id, b"xyz", None),
            Err(ObjectStoreError::Exists(_))
        ));
        assert_eq!(objects.open_for_read(&locator).unwrap().bytes(), b"abc");
        objects.set_unavailable(true);
        assert!(matches!(objects.open_for_read(&locator), Err(ObjectStoreError::Unavailable(_))));
    }
}
