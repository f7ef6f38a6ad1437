// crates/tablehub-core/src/core/fingerprint.rs
// ============================================================================
// Module: Tablehub Cache Fingerprints
// Description: Deterministic cache keys for chart query responses.
// Purpose: Key cached responses by every input that changes the response.
// Dependencies: serde, sha2, crate::core::{hashing, identifiers, query}
// ============================================================================

//! ## Overview
//! A fingerprint is the lowercase hex SHA-256 of a domain tag followed by the
//! ordered, length-delimited query fields: owner, database, resolved version,
//! table, both projected columns, and the filter column, operator, and value.
//! Length prefixes keep distinct field splits from colliding
//! (`("ab", "c")` never hashes like `("a", "bc")`).
//!
//! The requesting identity is mixed in only when the requester is the owner.
//! Every other requester, including anonymous, shares the public entry for
//! the same query.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::core::hashing::hex_encode;
use crate::core::identifiers::DatabaseName;
use crate::core::identifiers::Requester;
use crate::core::identifiers::TableName;
use crate::core::identifiers::UserName;
use crate::core::identifiers::Version;
use crate::core::query::QueryShape;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Domain separation tag for cache fingerprints.
const FINGERPRINT_DOMAIN: &[u8] = b"tablehub.cache.v1";

// ============================================================================
// SECTION: Fingerprint
// ============================================================================

/// Hex-encoded SHA-256 cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Returns the fingerprint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Query inputs that determine a cached response.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintInput<'a> {
    /// Database owner.
    pub owner: &'a UserName,
    /// Database name.
    pub database: &'a DatabaseName,
    /// Resolved version the response was computed from.
    pub version: Version,
    /// Requested table, if any.
    pub table: Option<&'a TableName>,
    /// Query shape.
    pub shape: &'a QueryShape,
    /// Requesting identity.
    pub requester: &'a Requester,
}

impl FingerprintInput<'_> {
    /// Computes the fingerprint for these inputs.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_DOMAIN);
        push_field(&mut hasher, self.owner.as_str().as_bytes());
        push_field(&mut hasher, self.database.as_str().as_bytes());
        push_field(&mut hasher, &self.version.get().to_be_bytes());
        push_optional(&mut hasher, self.table.map(TableName::as_str));
        match self.shape {
            QueryShape::FullDump => {
                push_field(&mut hasher, b"full_dump");
            }
            QueryShape::Projection {
                x,
                y,
                filter,
            } => {
                push_field(&mut hasher, b"projection");
                push_field(&mut hasher, x.as_str().as_bytes());
                push_field(&mut hasher, y.as_str().as_bytes());
                push_optional(&mut hasher, filter.as_ref().map(|clause| clause.column.as_str()));
                push_optional(&mut hasher, filter.as_ref().map(|clause| clause.operator.as_sql()));
                push_optional(&mut hasher, filter.as_ref().map(|clause| clause.value.as_str()));
            }
        }
        let identity = match self.requester.user() {
            Some(user) if user == self.owner => Some(user.as_str()),
            _ => None,
        };
        push_optional(&mut hasher, identity);
        Fingerprint(hex_encode(&hasher.finalize()))
    }
}

/// Appends a length-prefixed field.
fn push_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// Appends a presence marker followed by the field when present.
fn push_optional(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(value) => {
            hasher.update([1_u8]);
            push_field(hasher, value.as_bytes());
        }
        None => hasher.update([0_u8]),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;
    use crate::core::identifiers::ColumnName;

    fn shape(x: &str, y: &str) -> QueryShape {
        QueryShape::Projection {
            x: ColumnName::parse(x).unwrap(),
            y: ColumnName::parse(y).unwrap(),
            filter: None,
        }
    }

    fn key(owner: &UserName, requester: &Requester, shape: &QueryShape) -> Fingerprint {
        let database = DatabaseName::parse("sales.db").unwrap();
        FingerprintInput {
            owner,
            database: &database,
            version: Version::FIRST,
            table: None,
            shape,
            requester,
        }
        .fingerprint()
    }

    #[test]
    fn non_owners_share_the_public_entry() {
        let alice = UserName::parse("alice").unwrap();
        let shape = shape("a", "b");
        let anonymous = key(&alice, &Requester::Anonymous, &shape);
        let bob = key(&alice, &Requester::User(UserName::parse("bob").unwrap()), &shape);
        let owner = key(&alice, &Requester::User(alice.clone()), &shape);
        assert_eq!(anonymous, bob);
        assert_ne!(anonymous, owner);
        assert_eq!(anonymous.as_str().len(), 64);
    }

    #[test]
    fn field_boundaries_do_not_collide() {
        let alice = UserName::parse("alice").unwrap();
        let left = key(&alice, &Requester::Anonymous, &shape("ab", "c"));
        let right = key(&alice, &Requester::Anonymous, &shape("a", "bc"));
        assert_ne!(left, right);
    }
}
