// crates/tablehub-config/src/config.rs
// ============================================================================
// Module: Tablehub Configuration
// Description: Configuration loading and validation for Tablehub.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: tablehub-core, tablehub-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file yields a working local setup
//! (`SQLite` metadata and filesystem objects under the working directory).
//! Missing or invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use serde::Deserialize;
use tablehub_core::AuditSink;
use tablehub_core::DEFAULT_CACHE_TTL;
use tablehub_core::DEFAULT_MAX_CACHE_ENTRIES;
use tablehub_core::DEFAULT_MAX_UPLOAD_BYTES;
use tablehub_core::DEFAULT_MAX_USER_MAX_ROWS;
use tablehub_core::DEFAULT_OBJECT_ID_ATTEMPTS;
use tablehub_core::DEFAULT_ROW_CAP;
use tablehub_core::FileAuditSink;
use tablehub_core::NoopAuditSink;
use tablehub_core::PROJECTION_MAX_ROWS;
use tablehub_core::ServiceLimits;
use tablehub_core::StderrAuditSink;
use tablehub_core::UploadSettings;
use tablehub_store_sqlite::SqliteStoreConfig;
use tablehub_store_sqlite::SqliteStoreMode;
use tablehub_store_sqlite::SqliteSyncMode;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "tablehub.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TABLEHUB_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default metadata database path.
const DEFAULT_METADATA_PATH: &str = "tablehub.sqlite";
/// Default filesystem object root.
const DEFAULT_OBJECT_ROOT: &str = "objects";
/// Default `SQLite` busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum `SQLite` busy timeout in milliseconds.
const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Maximum cache lifetime in seconds.
const MAX_CACHE_TTL_SECONDS: u64 = 24 * 60 * 60;
/// Upper bound on object-id draws per upload.
const MAX_OBJECT_ID_ATTEMPTS: u32 = 1_024;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Tablehub configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TablehubConfig {
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Object store configuration.
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    /// Result cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Row and upload limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Audit output configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Optional config source metadata (not serialized).
    #[serde(skip)]
    pub source_modified_at: Option<SystemTime>,
}

impl TablehubConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from the argument, then [`CONFIG_ENV_VAR`], then
    /// `tablehub.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::parse(content)?;
        config.source_modified_at = fs::metadata(&resolved).and_then(|meta| meta.modified()).ok();
        Ok(config)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.metadata.validate()?;
        self.object_store.validate()?;
        self.cache.validate()?;
        self.limits.validate()?;
        self.audit.validate()
    }

    /// Returns the row caps and cache lifetime for the table service.
    #[must_use]
    pub const fn service_limits(&self) -> ServiceLimits {
        ServiceLimits {
            anonymous_max_rows: self.limits.anonymous_max_rows,
            default_user_max_rows: self.limits.default_user_max_rows,
            max_user_max_rows: self.limits.max_user_max_rows,
            chart_max_rows: self.limits.chart_max_rows,
            cache_ttl: self.cache.ttl(),
        }
    }

    /// Returns the upload pipeline limits.
    #[must_use]
    pub const fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            max_upload_bytes: self.limits.max_upload_bytes,
            object_id_attempts: self.limits.object_id_attempts,
        }
    }
}

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// `SQLite` metadata store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataConfig {
    /// `SQLite` database path.
    #[serde(default = "default_metadata_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            path: default_metadata_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl MetadataConfig {
    /// Validates metadata store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("metadata.path", &self.path.to_string_lossy())?;
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "metadata.busy_timeout_ms must be at most {MAX_BUSY_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }

    /// Returns the `SQLite` store configuration.
    #[must_use]
    pub fn store_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }
}

/// Returns the default metadata database path.
fn default_metadata_path() -> PathBuf {
    PathBuf::from(DEFAULT_METADATA_PATH)
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// Supported object-store providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStoreProvider {
    /// Local directory tree.
    #[default]
    Filesystem,
    /// Amazon S3 compatible object storage.
    S3,
}

/// Object-store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectStoreConfig {
    /// Provider selection for the object store.
    #[serde(default)]
    pub provider: ObjectStoreProvider,
    /// Root directory (filesystem only); `objects` when unset.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Bucket name (S3 only).
    #[serde(default)]
    pub bucket: Option<String>,
    /// Optional region (S3-only, defaults to environment).
    #[serde(default)]
    pub region: Option<String>,
    /// Optional object-store endpoint (S3-compatible).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Optional key prefix inside the bucket.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Force path-style addressing (S3-compatible).
    #[serde(default)]
    pub force_path_style: bool,
    /// Allow non-TLS endpoints (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
    /// Maximum object size accepted on read and write.
    #[serde(default = "default_max_object_bytes")]
    pub max_object_bytes: usize,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            provider: ObjectStoreProvider::Filesystem,
            root: None,
            bucket: None,
            region: None,
            endpoint: None,
            prefix: None,
            force_path_style: false,
            allow_http: false,
            max_object_bytes: default_max_object_bytes(),
        }
    }
}

impl ObjectStoreConfig {
    /// Validates object-store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when object-store settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_object_bytes == 0 {
            return Err(ConfigError::Invalid(
                "object_store.max_object_bytes must be greater than zero".to_string(),
            ));
        }
        match self.provider {
            ObjectStoreProvider::Filesystem => {
                if let Some(root) = &self.root {
                    validate_path_string("object_store.root", &root.to_string_lossy())?;
                }
                if self.bucket.is_some() || self.endpoint.is_some() {
                    return Err(ConfigError::Invalid(
                        "object_store.bucket and endpoint apply to the s3 provider only"
                            .to_string(),
                    ));
                }
            }
            ObjectStoreProvider::S3 => {
                if self.bucket.as_deref().is_none_or(|bucket| bucket.trim().is_empty()) {
                    return Err(ConfigError::Invalid(
                        "object_store.bucket must be set for the s3 provider".to_string(),
                    ));
                }
                if let Some(endpoint) = &self.endpoint {
                    let trimmed = endpoint.trim();
                    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
                        return Err(ConfigError::Invalid(
                            "object_store.endpoint must include http:// or https://".to_string(),
                        ));
                    }
                    if trimmed.starts_with("http://") && !self.allow_http {
                        return Err(ConfigError::Invalid(
                            "object_store.endpoint uses http:// without allow_http".to_string(),
                        ));
                    }
                }
                if let Some(prefix) = &self.prefix {
                    validate_object_store_prefix(prefix)?;
                }
            }
        }
        Ok(())
    }

    /// Returns the filesystem root, `objects` when unset.
    #[must_use]
    pub fn filesystem_root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_OBJECT_ROOT))
    }
}

/// Returns the default maximum object size.
const fn default_max_object_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Result cache configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Lifetime of cached chart responses in seconds; zero disables caching.
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Maximum number of cached responses.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl_seconds(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl CacheConfig {
    /// Returns the cache lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Validates cache configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_seconds > MAX_CACHE_TTL_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "cache.ttl_seconds must be at most {MAX_CACHE_TTL_SECONDS}"
            )));
        }
        if self.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the default cache lifetime in seconds.
const fn default_cache_ttl_seconds() -> u64 {
    DEFAULT_CACHE_TTL.as_secs()
}

/// Returns the default cache capacity.
const fn default_cache_max_entries() -> usize {
    DEFAULT_MAX_CACHE_ENTRIES
}

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Row caps and upload limits.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Row cap for anonymous requesters.
    #[serde(default = "default_row_cap")]
    pub anonymous_max_rows: u32,
    /// Row cap for users without a stored preference.
    #[serde(default = "default_row_cap")]
    pub default_user_max_rows: u32,
    /// Largest row cap a user may choose.
    #[serde(default = "default_max_user_max_rows")]
    pub max_user_max_rows: u32,
    /// Row cap for chart projections.
    #[serde(default = "default_chart_max_rows")]
    pub chart_max_rows: u32,
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Object-id draws before an upload fails.
    #[serde(default = "default_object_id_attempts")]
    pub object_id_attempts: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            anonymous_max_rows: default_row_cap(),
            default_user_max_rows: default_row_cap(),
            max_user_max_rows: default_max_user_max_rows(),
            chart_max_rows: default_chart_max_rows(),
            max_upload_bytes: default_max_upload_bytes(),
            object_id_attempts: default_object_id_attempts(),
        }
    }
}

impl LimitsConfig {
    /// Validates limit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.anonymous_max_rows == 0 || self.anonymous_max_rows > self.max_user_max_rows {
            return Err(ConfigError::Invalid(
                "limits.anonymous_max_rows must be between 1 and max_user_max_rows".to_string(),
            ));
        }
        if self.default_user_max_rows == 0 || self.default_user_max_rows > self.max_user_max_rows {
            return Err(ConfigError::Invalid(
                "limits.default_user_max_rows must be between 1 and max_user_max_rows".to_string(),
            ));
        }
        if self.chart_max_rows == 0 || self.chart_max_rows > PROJECTION_MAX_ROWS {
            return Err(ConfigError::Invalid(format!(
                "limits.chart_max_rows must be between 1 and {PROJECTION_MAX_ROWS}"
            )));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        if self.object_id_attempts == 0 || self.object_id_attempts > MAX_OBJECT_ID_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "limits.object_id_attempts must be between 1 and {MAX_OBJECT_ID_ATTEMPTS}"
            )));
        }
        Ok(())
    }
}

/// Returns the default row cap.
const fn default_row_cap() -> u32 {
    DEFAULT_ROW_CAP
}

/// Returns the default upper bound for user row caps.
const fn default_max_user_max_rows() -> u32 {
    DEFAULT_MAX_USER_MAX_ROWS
}

/// Returns the default chart row cap.
const fn default_chart_max_rows() -> u32 {
    PROJECTION_MAX_ROWS
}

/// Returns the default maximum upload size.
const fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

/// Returns the default object-id draw count.
const fn default_object_id_attempts() -> u32 {
    DEFAULT_OBJECT_ID_ATTEMPTS
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard audit events.
    None,
}

/// Audit output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => {
                validate_path_string("audit.path", &path.to_string_lossy())
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path applies to the file sink only".to_string()))
            }
            (_, None) => Ok(()),
        }
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn build_sink(&self) -> Result<Arc<dyn AuditSink>, ConfigError> {
        let sink: Arc<dyn AuditSink> = match (self.sink, &self.path) {
            (AuditSinkKind::Stderr, _) => Arc::new(StderrAuditSink),
            (AuditSinkKind::None, _) => Arc::new(NoopAuditSink),
            (AuditSinkKind::File, Some(path)) => Arc::new(
                FileAuditSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?,
            ),
            (AuditSinkKind::File, None) => {
                return Err(ConfigError::Invalid(
                    "audit.path is required for the file sink".to_string(),
                ));
            }
        };
        Ok(sink)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates the object-store prefix string.
fn validate_object_store_prefix(value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid("object_store.prefix must be non-empty".to_string()));
    }
    if trimmed.contains('\\') {
        return Err(ConfigError::Invalid(
            "object_store.prefix must not contain backslashes".to_string(),
        ));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("object_store.prefix exceeds max length".to_string()));
    }
    if trimmed.starts_with('/') {
        return Err(ConfigError::Invalid("object_store.prefix must be relative".to_string()));
    }
    let normalized = trimmed.strip_suffix('/').unwrap_or(trimmed);
    for component in Path::new(normalized).components() {
        match component {
            Component::Normal(value) => {
                if value.len() > MAX_PATH_COMPONENT_LENGTH {
                    return Err(ConfigError::Invalid(
                        "object_store.prefix segment too long".to_string(),
                    ));
                }
            }
            _ => {
                return Err(ConfigError::Invalid(
                    "object_store.prefix must be relative without traversal".to_string(),
                ));
            }
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::validate_object_store_prefix;
    use super::validate_path_string;

    #[test]
    fn object_store_prefix_rejects_traversal_and_absolute_paths() {
        assert!(validate_object_store_prefix("tablehub/objects/").is_ok());
        assert!(validate_object_store_prefix("/abs").is_err());
        assert!(validate_object_store_prefix("a/../b").is_err());
        assert!(validate_object_store_prefix("a\\b").is_err());
        assert!(validate_object_store_prefix("  ").is_err());
    }

    #[test]
    fn path_strings_reject_overlong_components() {
        assert!(validate_path_string("field", "data/meta.sqlite").is_ok());
        let long = "a".repeat(256);
        let err = validate_path_string("field", &long).err().map(|err| err.to_string());
        assert_eq!(err.as_deref(), Some("invalid config: field path component too long"));
    }
}
