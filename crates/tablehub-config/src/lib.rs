// crates/tablehub-config/src/lib.rs
// ============================================================================
// Module: Tablehub Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for tablehub.toml semantics.
// Dependencies: tablehub-core, tablehub-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `tablehub-config` defines the configuration model for Tablehub: metadata
//! persistence, object storage, caching, row and upload limits, and audit
//! output. Loading is strict and fails closed on any invalid value.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
