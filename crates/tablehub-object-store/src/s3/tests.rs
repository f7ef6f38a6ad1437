// crates/tablehub-object-store/src/s3/tests.rs
// ============================================================================
// Module: S3 Object Store Tests
// Description: Unit tests for the S3-backed object store.
// Purpose: Validate key layout, missing objects, and size limits.
// Dependencies: tablehub-object-store, tablehub-core
// ============================================================================

//! ## Overview
//! Runs the S3 store over an in-memory key/value client so key derivation
//! and limit handling are checked without a live endpoint.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::*;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

#[derive(Default)]
struct InMemoryClient {
    objects: Mutex<BTreeMap<String, (Vec<u8>, Option<String>)>>,
}

impl InMemoryClient {
    fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    fn content_type(&self, key: &str) -> Option<String> {
        self.objects.lock().unwrap().get(key).and_then(|(_, content_type)| content_type.clone())
    }
}

impl ObjectClient for InMemoryClient {
    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        let mut guard = self.objects.lock().unwrap();
        if guard.contains_key(key) {
            return Err(ObjectStoreError::Exists(key.to_string()));
        }
        guard.insert(key.to_string(), (bytes, content_type.map(str::to_string)));
        Ok(())
    }

    fn get(&self, key: &str, max_bytes: usize) -> Result<Vec<u8>, ObjectStoreError> {
        let guard = self.objects.lock().unwrap();
        let Some((bytes, _)) = guard.get(key) else {
            return Err(ObjectStoreError::Missing(key.to_string()));
        };
        if bytes.len() > max_bytes {
            return Err(ObjectStoreError::TooLarge {
                max_bytes,
                actual_bytes: bytes.len() as u64,
            });
        }
        Ok(bytes.clone())
    }
}

fn locator(bucket: &str, object_id: &str) -> StorageLocator {
    StorageLocator::new(BucketName::parse(bucket).unwrap(), ObjectId::parse(object_id).unwrap())
}

fn store(client: &Arc<InMemoryClient>, prefix: &str, max: usize) -> S3ObjectStore {
    let client: Arc<dyn ObjectClient> = Arc::clone(client) as Arc<dyn ObjectClient>;
    S3ObjectStore::from_client(client, prefix, max).unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn objects_are_keyed_under_prefix_and_bucket() {
    let client = Arc::new(InMemoryClient::default());
    let store = store(&client, "prod", 1024);
    let target = locator("alice", "abc.db");
    let size = store
        .store(&target.bucket, &target.object_id, b"payload", Some("application/x-sqlite3"))
        .unwrap();
    assert_eq!(size, 7);
    assert_eq!(client.keys(), vec!["prod/alice/abc.db".to_string()]);
    assert_eq!(
        client.content_type("prod/alice/abc.db").as_deref(),
        Some("application/x-sqlite3")
    );
    let handle = store.open_for_read(&target).unwrap();
    assert_eq!(handle.bytes(), b"payload");
    assert_eq!(handle.locator(), &target);
}

#[test]
fn empty_prefix_keys_start_at_bucket() {
    let client = Arc::new(InMemoryClient::default());
    let store = store(&client, "", 1024);
    let target = locator("bob", "x.db");
    store.store(&target.bucket, &target.object_id, b"1", None).unwrap();
    assert_eq!(client.keys(), vec!["bob/x.db".to_string()]);
}

#[test]
fn absent_objects_are_missing() {
    let client = Arc::new(InMemoryClient::default());
    let store = store(&client, "", 1024);
    let err = store.open_for_read(&locator("alice", "gone.db")).unwrap_err();
    assert!(matches!(err, ObjectStoreError::Missing(_)));
}

#[test]
fn taken_keys_are_reported_as_existing() {
    let client = Arc::new(InMemoryClient::default());
    let store = store(&client, "prod", 1024);
    let target = locator("alice", "abc.db");
    store.store(&target.bucket, &target.object_id, b"first", None).unwrap();
    let err = store.store(&target.bucket, &target.object_id, b"second", None).unwrap_err();
    assert_eq!(err, ObjectStoreError::Exists("prod/alice/abc.db".to_string()));
    assert_eq!(store.open_for_read(&target).unwrap().bytes(), b"first");
}

#[test]
fn oversized_objects_are_rejected_before_upload() {
    let client = Arc::new(InMemoryClient::default());
    let store = store(&client, "", 4);
    let target = locator("alice", "big.db");
    let err = store.store(&target.bucket, &target.object_id, b"12345", None).unwrap_err();
    assert_eq!(
        err,
        ObjectStoreError::TooLarge {
            max_bytes: 4,
            actual_bytes: 5,
        }
    );
    assert!(client.keys().is_empty());
}

#[test]
fn traversing_prefixes_are_rejected() {
    let client: Arc<dyn ObjectClient> = Arc::new(InMemoryClient::default());
    assert!(S3ObjectStore::from_client(client, "../escape", 16).is_err());
}
