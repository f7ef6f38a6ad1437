// crates/tablehub-object-store/src/s3.rs
// ============================================================================
// Module: S3 Object Store
// Description: ObjectStore backed by one S3-compatible bucket.
// Purpose: Persist immutable database objects in durable object storage.
// Dependencies: tablehub-core, tablehub-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! Every tablehub bucket becomes a key segment inside a single configured S3
//! bucket: `prefix/bucket/object_id`. The store presents a blocking
//! interface; S3 calls run on a dedicated Tokio runtime owned by the client.
//! Reads stream the body and abort as soon as the configured maximum object
//! size is exceeded. A 404 or `NoSuchKey` response is reported as a missing
//! object; every other failure, timeouts included, as unavailability.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use tablehub_config::ObjectStoreConfig;
use tablehub_core::BucketName;
use tablehub_core::ObjectHandle;
use tablehub_core::ObjectId;
use tablehub_core::ObjectStore;
use tablehub_core::ObjectStoreError;
use tablehub_core::StorageLocator;
use tokio::io::AsyncReadExt;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::runtime::RuntimeFlavor;

use crate::keys::MAX_TOTAL_PATH_LENGTH;
use crate::keys::locator_key;
use crate::keys::normalize_prefix;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Upper bound on a single S3 operation, retries included.
const OPERATION_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP status returned for absent keys.
const STATUS_NOT_FOUND: u16 = 404;
/// HTTP status returned when a conditional put finds the key taken.
const STATUS_PRECONDITION_FAILED: u16 = 412;
/// Read chunk size for streamed bodies.
const READ_CHUNK_BYTES: usize = 8192;

// ============================================================================
// SECTION: Runtime Helpers
// ============================================================================

/// Blocks on an object-store future using a compatible runtime.
fn block_on_with_runtime<F, T>(runtime: &Runtime, future: F) -> Result<T, ObjectStoreError>
where
    F: Future<Output = Result<T, ObjectStoreError>> + Send + 'static,
    T: Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
            return tokio::task::block_in_place(|| handle.block_on(future));
        }
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        std::thread::spawn(move || {
            let result = Runtime::new()
                .map_err(|err| ObjectStoreError::Unavailable(err.to_string()))
                .and_then(|runtime| runtime.block_on(future));
            let _ = tx.send(result);
        });
        return rx.recv().unwrap_or_else(|_| {
            Err(ObjectStoreError::Unavailable("object store thread join failed".to_string()))
        });
    }
    runtime.block_on(future)
}

// ============================================================================
// SECTION: Object Client
// ============================================================================

/// Minimal key/value client beneath the S3 store.
pub(crate) trait ObjectClient: Send + Sync {
    /// Writes a single object.
    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError>;
    /// Reads a single object with a size limit.
    fn get(&self, key: &str, max_bytes: usize) -> Result<Vec<u8>, ObjectStoreError>;
}

/// AWS SDK client bound to one bucket.
struct S3Client {
    /// Underlying S3 client.
    client: Client,
    /// S3 bucket name.
    bucket: String,
    /// Tokio runtime for blocking S3 operations.
    runtime: Option<Arc<Runtime>>,
}

impl Drop for S3Client {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

impl S3Client {
    /// Builds a client from configuration.
    fn new(config: &ObjectStoreConfig, bucket: String) -> Result<Self, ObjectStoreError> {
        let runtime = Runtime::new().map_err(|err| ObjectStoreError::Unavailable(err.to_string()))?;
        let region = config.region.clone();
        let endpoint = config.endpoint.clone();
        let shared_config = block_on_with_runtime(&runtime, async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest())
                .timeout_config(TimeoutConfig::builder().operation_timeout(OPERATION_TIMEOUT).build());
            if let Some(region) = region {
                loader = loader.region(Region::new(region));
            }
            if let Some(endpoint) = endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            Ok(loader.load().await)
        })?;
        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }
        Ok(Self {
            client: Client::from_conf(s3_builder.build()),
            bucket,
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Returns the runtime or an error if shut down.
    fn runtime(&self) -> Result<&Runtime, ObjectStoreError> {
        self.runtime
            .as_ref()
            .map(AsRef::as_ref)
            .ok_or_else(|| ObjectStoreError::Unavailable("object store runtime closed".to_string()))
    }
}

impl ObjectClient for S3Client {
    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        let bucket = self.bucket.clone();
        let key = key.to_string();
        let client = self.client.clone();
        let content_type = content_type.map(str::to_string);
        block_on_with_runtime(self.runtime()?, async move {
            let mut request = client
                .put_object()
                .bucket(bucket)
                .key(key.clone())
                .if_none_match("*")
                .body(ByteStream::from(bytes));
            if let Some(content_type) = content_type {
                request = request.content_type(content_type);
            }
            request.send().await.map_err(|err| {
                let taken = err
                    .raw_response()
                    .is_some_and(|raw| raw.status().as_u16() == STATUS_PRECONDITION_FAILED);
                if taken {
                    ObjectStoreError::Exists(key.clone())
                } else {
                    ObjectStoreError::Unavailable(err.to_string())
                }
            })?;
            Ok(())
        })
    }

    fn get(&self, key: &str, max_bytes: usize) -> Result<Vec<u8>, ObjectStoreError> {
        let bucket = self.bucket.clone();
        let key = key.to_string();
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            let output = client.get_object().bucket(bucket).key(key.clone()).send().await.map_err(
                |err| {
                    let not_found = err
                        .raw_response()
                        .is_some_and(|raw| raw.status().as_u16() == STATUS_NOT_FOUND)
                        || err.as_service_error().is_some_and(|service| service.is_no_such_key());
                    if not_found {
                        ObjectStoreError::Missing(key.clone())
                    } else {
                        ObjectStoreError::Unavailable(err.to_string())
                    }
                },
            )?;
            if let Some(length) = output.content_length() {
                let actual_bytes = u64::try_from(length).unwrap_or(0);
                if actual_bytes > u64::try_from(max_bytes).unwrap_or(u64::MAX) {
                    return Err(ObjectStoreError::TooLarge {
                        max_bytes,
                        actual_bytes,
                    });
                }
            }
            let mut reader = output.body.into_async_read();
            let mut buffer = Vec::new();
            let mut chunk = [0u8; READ_CHUNK_BYTES];
            loop {
                let read = reader
                    .read(&mut chunk)
                    .await
                    .map_err(|err| ObjectStoreError::Unavailable(err.to_string()))?;
                if read == 0 {
                    break;
                }
                if buffer.len().saturating_add(read) > max_bytes {
                    return Err(ObjectStoreError::TooLarge {
                        max_bytes,
                        actual_bytes: u64::try_from(buffer.len().saturating_add(read))
                            .unwrap_or(u64::MAX),
                    });
                }
                buffer.extend_from_slice(&chunk[.. read]);
            }
            Ok(buffer)
        })
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Object store backed by one S3-compatible bucket.
pub struct S3ObjectStore {
    /// Key/value client.
    client: Arc<dyn ObjectClient>,
    /// Normalized key prefix, empty or ending in `/`.
    prefix: String,
    /// Maximum object size accepted on read and write.
    max_object_bytes: usize,
}

impl S3ObjectStore {
    /// Creates a store from object-store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when configuration or initialization fails.
    pub fn new(config: &ObjectStoreConfig) -> Result<Self, ObjectStoreError> {
        config.validate().map_err(|err| ObjectStoreError::Invalid(err.to_string()))?;
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| ObjectStoreError::Invalid("s3 bucket must be set".to_string()))?;
        let prefix = normalize_prefix(config.prefix.as_deref().unwrap_or(""))?;
        Ok(Self {
            client: Arc::new(S3Client::new(config, bucket)?),
            prefix,
            max_object_bytes: config.max_object_bytes,
        })
    }

    /// Creates a store over a custom client.
    #[cfg(test)]
    pub(crate) fn from_client(
        client: Arc<dyn ObjectClient>,
        prefix: &str,
        max_object_bytes: usize,
    ) -> Result<Self, ObjectStoreError> {
        Ok(Self {
            client,
            prefix: normalize_prefix(prefix)?,
            max_object_bytes,
        })
    }

    /// Returns the full key for a locator.
    fn object_key(&self, locator: &StorageLocator) -> Result<String, ObjectStoreError> {
        let key = format!("{}{}", self.prefix, locator_key(locator)?);
        if key.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ObjectStoreError::Invalid("object key exceeds length limit".to_string()));
        }
        Ok(key)
    }
}

impl ObjectStore for S3ObjectStore {
    fn open_for_read(&self, locator: &StorageLocator) -> Result<ObjectHandle, ObjectStoreError> {
        let key = self.object_key(locator)?;
        let bytes = self.client.get(&key, self.max_object_bytes)?;
        Ok(ObjectHandle::new(locator.clone(), bytes))
    }

    fn store(
        &self,
        bucket: &BucketName,
        object_id: &ObjectId,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<u64, ObjectStoreError> {
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        if bytes.len() > self.max_object_bytes {
            return Err(ObjectStoreError::TooLarge {
                max_bytes: self.max_object_bytes,
                actual_bytes: size,
            });
        }
        let key = self.object_key(&StorageLocator::new(bucket.clone(), object_id.clone()))?;
        self.client.put(&key, bytes.to_vec(), content_type)?;
        Ok(size)
    }
}

#[cfg(test)]
mod tests;
