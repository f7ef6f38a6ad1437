// crates/tablehub-cli/src/lib.rs
// ============================================================================
// Module: Tablehub CLI Library
// Description: Shared helpers for the Tablehub command-line interface.
// Purpose: Provide the message catalog used by the CLI binary and tests.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! This library houses the CLI message catalog. The binary entry point
//! (`src/main.rs`) formats every user-facing line through [`t!`] so wording
//! stays consistent across commands.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Message catalog and formatting helpers.
pub mod i18n;
