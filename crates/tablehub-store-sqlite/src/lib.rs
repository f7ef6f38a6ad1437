// crates/tablehub-store-sqlite/src/lib.rs
// ============================================================================
// Module: Tablehub SQLite Backends
// Description: SQLite metadata store and embedded table engine.
// Purpose: Provide production persistence and query execution for Tablehub.
// Dependencies: tablehub-core, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! This crate provides two SQLite-backed components. [`SqliteMetadataStore`]
//! persists version records, stars, and preferences in an append-only schema
//! whose uniqueness constraints reject duplicate versions and reused storage
//! locators. [`SqliteTableEngine`] opens uploaded database files read-only
//! from scoped scratch files and runs the supported query shapes against
//! them. Uploaded files are untrusted input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod engine;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::SqliteTableEngine;
pub use store::SqliteMetadataStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
