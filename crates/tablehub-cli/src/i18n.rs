// crates/tablehub-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Message catalog and placeholder substitution for the CLI.
// Purpose: Centralize user-facing strings emitted by the tablehub binary.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! User-facing CLI strings live in one keyed catalog. Commands format them
//! through the [`t!`](crate::t) macro, which substitutes `{name}` placeholders
//! with preformatted argument values.
//!
//! ## Invariants
//! - The catalog is built once and read-only thereafter.
//! - Unknown keys render as the key itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Catalog entries keyed by message identifier.
const CATALOG: &[(&str, &str)] = &[
    ("main.version", "tablehub {version}"),
    ("main.no_command", "No command given. Run `tablehub --help` for usage."),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.serialize_failed", "Failed to serialize output: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("backend.metadata_failed", "Failed to open metadata store: {error}"),
    ("backend.objects_failed", "Failed to open object store: {error}"),
    ("backend.audit_failed", "Failed to open audit sink: {error}"),
    ("requester.invalid", "Invalid --user value: {error}"),
    ("input.read_failed", "Failed to read {path}: {error}"),
    ("input.too_large", "Refusing to read {path}: {size} bytes exceeds the {limit} byte limit."),
    ("command.failed", "{operation} failed: {error}"),
    ("upload.ok", "Uploaded {owner}/{name} version {version} ({size} bytes, {visibility})."),
    ("download.ok", "Wrote {owner}/{name} version {version} to {path} ({size} bytes)."),
    ("csv.ok", "Wrote table {table} to {path}."),
    ("output.write_file_failed", "Failed to write {path}: {error}"),
    ("visibility.ok", "{owner}/{name} is now {visibility}."),
    ("star.toggled.on", "Starred {owner}/{name} ({count} stars)."),
    ("star.toggled.off", "Unstarred {owner}/{name} ({count} stars)."),
    ("star.count", "{count}"),
    ("prefs.row_cap", "Row cap: {rows}"),
    ("prefs.updated", "Row cap set to {rows}."),
];

/// Returns the message catalog.
fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    CATALOG_MAP.get_or_init(|| CATALOG.iter().copied().collect())
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Renders `key` while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::translate;

    #[test]
    fn placeholders_are_substituted() {
        let message = crate::t!("prefs.row_cap", rows = 25);
        assert_eq!(message, "Row cap: 25");
    }

    #[test]
    fn unknown_keys_render_verbatim() {
        assert_eq!(translate("no.such.key", Vec::new()), "no.such.key");
    }

    #[test]
    fn catalog_keys_are_unique() {
        let mut keys: Vec<&str> = super::CATALOG.iter().map(|(key, _)| *key).collect();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }
}
