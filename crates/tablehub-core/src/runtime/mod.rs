// crates/tablehub-core/src/runtime/mod.rs
// ============================================================================
// Module: Tablehub Runtime
// Description: Version resolution, uploads, result caching, and the service facade.
// Purpose: Execute Tablehub operations against backend-agnostic interfaces.
// Dependencies: crate::{core, interfaces}, dashmap, rand
// ============================================================================

//! ## Overview
//! Runtime modules implement the behaviour behind every Tablehub operation.
//! The [`TableService`] is the single entry point used by outer layers; the
//! resolver, upload pipeline, and cache are usable on their own for tests and
//! tooling. In-memory backends live in [`store`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cache;
pub mod resolver;
pub mod service;
pub mod store;
pub mod upload;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::Clock;
pub use cache::DEFAULT_MAX_CACHE_ENTRIES;
pub use cache::InMemoryResultCache;
pub use cache::ManualClock;
pub use cache::SystemClock;
pub use resolver::VersionResolver;
pub use service::ChartRequest;
pub use service::CsvExport;
pub use service::DEFAULT_CACHE_TTL;
pub use service::DEFAULT_MAX_USER_MAX_ROWS;
pub use service::DatabaseRequest;
pub use service::Download;
pub use service::ServiceBackends;
pub use service::ServiceLimits;
pub use service::StarState;
pub use service::TableService;
pub use service::TableViewRequest;
pub use store::InMemoryMetadataStore;
pub use store::InMemoryObjectStore;
pub use upload::DEFAULT_CONTENT_TYPE;
pub use upload::DEFAULT_MAX_UPLOAD_BYTES;
pub use upload::DEFAULT_OBJECT_ID_ATTEMPTS;
pub use upload::ObjectIdSource;
pub use upload::RandomObjectIds;
pub use upload::UploadPipeline;
pub use upload::UploadRequest;
pub use upload::UploadSettings;
