// crates/tablehub-core/src/lib.rs
// ============================================================================
// Module: Tablehub Core Library
// Description: Public API surface for the Tablehub core.
// Purpose: Expose identifiers, records, interfaces, and runtime services.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Tablehub core decides which bytes represent a requested database version,
//! what subset of its data may be returned, and how repeated identical
//! requests avoid recomputation. It is backend-agnostic: metadata, object
//! storage, and the embedded table engine are reached through the traits in
//! [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CacheError;
pub use interfaces::EngineError;
pub use interfaces::MetadataError;
pub use interfaces::MetadataStore;
pub use interfaces::ObjectHandle;
pub use interfaces::ObjectStore;
pub use interfaces::ObjectStoreError;
pub use interfaces::ResultCache;
pub use interfaces::TableEngine;
pub use runtime::ChartRequest;
pub use runtime::Clock;
pub use runtime::CsvExport;
pub use runtime::DEFAULT_CACHE_TTL;
pub use runtime::DEFAULT_CONTENT_TYPE;
pub use runtime::DEFAULT_MAX_CACHE_ENTRIES;
pub use runtime::DEFAULT_MAX_UPLOAD_BYTES;
pub use runtime::DEFAULT_MAX_USER_MAX_ROWS;
pub use runtime::DEFAULT_OBJECT_ID_ATTEMPTS;
pub use runtime::DatabaseRequest;
pub use runtime::Download;
pub use runtime::InMemoryMetadataStore;
pub use runtime::InMemoryObjectStore;
pub use runtime::InMemoryResultCache;
pub use runtime::ManualClock;
pub use runtime::ObjectIdSource;
pub use runtime::RandomObjectIds;
pub use runtime::ServiceBackends;
pub use runtime::ServiceLimits;
pub use runtime::StarState;
pub use runtime::SystemClock;
pub use runtime::TableService;
pub use runtime::TableViewRequest;
pub use runtime::UploadPipeline;
pub use runtime::UploadRequest;
pub use runtime::UploadSettings;
pub use runtime::VersionResolver;
