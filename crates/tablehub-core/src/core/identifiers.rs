// crates/tablehub-core/src/core/identifiers.rs
// ============================================================================
// Module: Tablehub Identifiers
// Description: Validated identifiers for owners, databases, tables, and columns.
// Purpose: Reject untrusted names before they reach storage or query text.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every identifier that names a schema object or a storage path is wrapped in
//! a newtype that can only be built through a validator. Validators accept a
//! raw, already URL-unescaped string and either return it unchanged inside the
//! newtype or reject it with an [`IdentifierError`].
//!
//! Table and column names are later interpolated into generated SQL as quoted
//! identifiers, so their whitelist is deliberately narrow. Filter values are
//! not identifiers and never pass through this module; they are always bound
//! as query parameters.
//!
//! Bot-injected template placeholders (for example `{{ db.Tablename }}`) are
//! rejected with [`IdentifierRejection::TemplatePlaceholder`], which callers
//! treat as routine noise rather than an error worth reporting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU32;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum length of an owner or user name.
pub const MAX_USER_NAME_LENGTH: usize = 63;
/// Maximum length of a database name.
pub const MAX_DATABASE_NAME_LENGTH: usize = 256;
/// Maximum length of a table or column name.
pub const MAX_SCHEMA_NAME_LENGTH: usize = 63;
/// Maximum length of a branch, tag, or release name.
pub const MAX_BRANCH_NAME_LENGTH: usize = 32;
/// Exact length of a commit identifier (hex-encoded SHA-256).
pub const COMMIT_ID_LENGTH: usize = 64;
/// Maximum length of a storage bucket name.
pub const MAX_BUCKET_NAME_LENGTH: usize = 63;
/// Maximum length of a storage object identifier.
pub const MAX_OBJECT_ID_LENGTH: usize = 64;

/// User names that cannot be claimed by new accounts.
const RESERVED_USER_NAMES: &[&str] = &[
    "about", "admin", "administrator", "api", "blog", "download", "help", "images", "login",
    "logout", "pref", "root", "selectusername", "stars", "system", "upload", "x",
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier category used in rejection messages and audit labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    /// Owner or user name.
    User,
    /// Database file name.
    Database,
    /// Table name inside a database.
    Table,
    /// Column name inside a table.
    Column,
    /// Branch, tag, or release name.
    Branch,
    /// Commit identifier.
    Commit,
    /// Version number tag.
    Version,
    /// Storage bucket name.
    Bucket,
    /// Storage object identifier.
    Object,
}

impl IdentifierKind {
    /// Returns a stable label for the identifier kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Database => "database",
            Self::Table => "table",
            Self::Column => "column",
            Self::Branch => "branch",
            Self::Commit => "commit",
            Self::Version => "version",
            Self::Bucket => "bucket",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed rejection reason for an invalid identifier.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierRejection {
    /// Input was empty.
    Empty,
    /// Input exceeded the maximum length.
    TooLong,
    /// Input contained a character outside the whitelist.
    DisallowedChar,
    /// Input used a reserved value.
    Reserved,
    /// Input looked like an unrendered template placeholder.
    TemplatePlaceholder,
    /// Input did not match the required shape.
    Malformed,
}

impl IdentifierRejection {
    /// Returns a stable label for this rejection reason.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooLong => "too_long",
            Self::DisallowedChar => "disallowed_char",
            Self::Reserved => "reserved",
            Self::TemplatePlaceholder => "template_placeholder",
            Self::Malformed => "malformed",
        }
    }
}

impl fmt::Display for IdentifierRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifier validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} name: {rejection}")]
pub struct IdentifierError {
    /// Identifier category that failed validation.
    pub kind: IdentifierKind,
    /// Reason the identifier was rejected.
    pub rejection: IdentifierRejection,
}

impl IdentifierError {
    /// Creates a new identifier error.
    #[must_use]
    pub const fn new(kind: IdentifierKind, rejection: IdentifierRejection) -> Self {
        Self {
            kind,
            rejection,
        }
    }

    /// Returns true when the rejection is routine bot noise.
    #[must_use]
    pub const fn is_noise(&self) -> bool {
        matches!(self.rejection, IdentifierRejection::TemplatePlaceholder)
    }
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Owner or user name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserName(String);

impl UserName {
    /// Validates and wraps a user name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the name is rejected.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        validate_user_name(raw)
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Database file name as uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseName(String);

impl DatabaseName {
    /// Validates and wraps a database name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the name is rejected.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        validate_database_name(raw)
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Table name inside an uploaded database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Validates and wraps a table name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the name is rejected.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        validate_table_name(raw)
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Column name inside a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnName(String);

impl ColumnName {
    /// Validates and wraps a column name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the name is rejected.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        validate_column_name(raw)
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Branch, tag, or release name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Validates and wraps a branch name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the name is rejected.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        validate_branch_name(raw)
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Commit identifier (lowercase hex SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(String);

impl CommitId {
    /// Validates and wraps a commit identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the identifier is rejected.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        validate_commit_id(raw)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Storage bucket name. Buckets are opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BucketName(String);

impl BucketName {
    /// Validates and wraps a bucket name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the name is rejected.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        check_length(IdentifierKind::Bucket, raw, MAX_BUCKET_NAME_LENGTH)?;
        check_segment(IdentifierKind::Bucket, raw)?;
        Ok(Self(raw.to_string()))
    }

    /// Returns the bucket assigned to an owner.
    #[must_use]
    pub fn for_owner(owner: &UserName) -> Self {
        Self(owner.as_str().to_string())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Storage object identifier within a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Validates and wraps an object identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the identifier is rejected.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        check_length(IdentifierKind::Object, raw, MAX_OBJECT_ID_LENGTH)?;
        check_segment(IdentifierKind::Object, raw)?;
        Ok(Self(raw.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_identifier_impls {
    ($($name:ident),+ $(,)?) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    self.0.fmt(f)
                }
            }

            impl AsRef<str> for $name {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }

            impl TryFrom<String> for $name {
                type Error = IdentifierError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    Self::parse(&value)
                }
            }

            impl From<$name> for String {
                fn from(value: $name) -> Self {
                    value.0
                }
            }
        )+
    };
}

string_identifier_impls!(
    UserName,
    DatabaseName,
    TableName,
    ColumnName,
    BranchName,
    CommitId,
    BucketName,
    ObjectId,
);

// ============================================================================
// SECTION: Requester
// ============================================================================

/// Identity of the caller, supplied by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Requester {
    /// No logged-in identity.
    #[default]
    Anonymous,
    /// Authenticated user.
    User(UserName),
}

impl Requester {
    /// Builds a requester from the session layer's raw identity string.
    ///
    /// An empty string means anonymous.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when a non-empty identity is malformed.
    pub fn from_raw(raw: &str) -> Result<Self, IdentifierError> {
        if raw.is_empty() {
            return Ok(Self::Anonymous);
        }
        UserName::parse(raw).map(Self::User)
    }

    /// Returns true when the requester is exactly the given user.
    #[must_use]
    pub fn is(&self, user: &UserName) -> bool {
        matches!(self, Self::User(name) if name == user)
    }

    /// Returns the user name for authenticated requesters.
    #[must_use]
    pub const fn user(&self) -> Option<&UserName> {
        match self {
            Self::Anonymous => None,
            Self::User(name) => Some(name),
        }
    }

    /// Returns the identity string, empty for anonymous.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Anonymous => "",
            Self::User(name) => name.as_str(),
        }
    }
}

// ============================================================================
// SECTION: Versions
// ============================================================================

/// Database version number (starts at 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(NonZeroU32);

impl Version {
    /// First version assigned to a new database.
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Creates a version from a positive integer.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Returns the numeric version.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Returns the following version, or `None` on overflow.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Requested version: latest or an exact number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VersionSelector {
    /// Highest stored version.
    #[default]
    Latest,
    /// Exact stored version.
    Exact(Version),
}

impl VersionSelector {
    /// Builds a selector from a numeric tag where `0` means latest.
    #[must_use]
    pub fn from_number(value: u32) -> Self {
        Version::new(value).map_or(Self::Latest, Self::Exact)
    }

    /// Parses a version tag where empty or `0` means latest.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the tag is not a decimal integer.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        if raw.is_empty() {
            return Ok(Self::Latest);
        }
        if raw.len() > 10 || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(IdentifierError::new(
                IdentifierKind::Version,
                IdentifierRejection::Malformed,
            ));
        }
        raw.parse::<u32>()
            .map(Self::from_number)
            .map_err(|_| IdentifierError::new(IdentifierKind::Version, IdentifierRejection::TooLong))
    }
}

// ============================================================================
// SECTION: Validators
// ============================================================================

/// Validates an owner or user name.
///
/// # Errors
///
/// Returns [`IdentifierError`] when the name is rejected.
pub fn validate_user_name(raw: &str) -> Result<UserName, IdentifierError> {
    let kind = IdentifierKind::User;
    check_placeholder(kind, raw)?;
    check_length(kind, raw, MAX_USER_NAME_LENGTH)?;
    if raw.starts_with(['.', '-']) {
        return Err(IdentifierError::new(kind, IdentifierRejection::Malformed));
    }
    check_chars(kind, raw, |ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))?;
    Ok(UserName(raw.to_string()))
}

/// Validates a user name chosen for a new account, rejecting reserved names.
///
/// # Errors
///
/// Returns [`IdentifierError`] when the name is rejected or reserved.
pub fn validate_new_user_name(raw: &str) -> Result<UserName, IdentifierError> {
    let name = validate_user_name(raw)?;
    let lowered = raw.to_ascii_lowercase();
    if RESERVED_USER_NAMES.contains(&lowered.as_str()) {
        return Err(IdentifierError::new(IdentifierKind::User, IdentifierRejection::Reserved));
    }
    Ok(name)
}

/// Validates a database file name.
///
/// # Errors
///
/// Returns [`IdentifierError`] when the name is rejected.
pub fn validate_database_name(raw: &str) -> Result<DatabaseName, IdentifierError> {
    let kind = IdentifierKind::Database;
    check_placeholder(kind, raw)?;
    check_length(kind, raw, MAX_DATABASE_NAME_LENGTH)?;
    if raw == "." || raw == ".." {
        return Err(IdentifierError::new(kind, IdentifierRejection::Reserved));
    }
    check_chars(kind, raw, |ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | ' ' | '(' | ')' | '+' | ',')
    })?;
    Ok(DatabaseName(raw.to_string()))
}

/// Validates a table name for interpolation as a quoted identifier.
///
/// # Errors
///
/// Returns [`IdentifierError`] when the name is rejected.
pub fn validate_table_name(raw: &str) -> Result<TableName, IdentifierError> {
    validate_schema_name(IdentifierKind::Table, raw).map(|()| TableName(raw.to_string()))
}

/// Validates a column name for interpolation as a quoted identifier.
///
/// # Errors
///
/// Returns [`IdentifierError`] when the name is rejected.
pub fn validate_column_name(raw: &str) -> Result<ColumnName, IdentifierError> {
    validate_schema_name(IdentifierKind::Column, raw).map(|()| ColumnName(raw.to_string()))
}

/// Validates a branch, tag, or release name.
///
/// # Errors
///
/// Returns [`IdentifierError`] when the name is rejected.
pub fn validate_branch_name(raw: &str) -> Result<BranchName, IdentifierError> {
    let kind = IdentifierKind::Branch;
    check_placeholder(kind, raw)?;
    check_length(kind, raw, MAX_BRANCH_NAME_LENGTH)?;
    if raw.contains("..") || raw.starts_with('/') || raw.ends_with('/') {
        return Err(IdentifierError::new(kind, IdentifierRejection::Malformed));
    }
    check_chars(kind, raw, |ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | '/'))?;
    Ok(BranchName(raw.to_string()))
}

/// Validates a commit identifier.
///
/// # Errors
///
/// Returns [`IdentifierError`] when the identifier is rejected.
pub fn validate_commit_id(raw: &str) -> Result<CommitId, IdentifierError> {
    let kind = IdentifierKind::Commit;
    check_length(kind, raw, COMMIT_ID_LENGTH)?;
    if raw.len() != COMMIT_ID_LENGTH {
        return Err(IdentifierError::new(kind, IdentifierRejection::Malformed));
    }
    check_chars(kind, raw, |ch| ch.is_ascii_digit() || ('a' ..= 'f').contains(&ch))?;
    Ok(CommitId(raw.to_string()))
}

/// Shared rules for table and column names.
fn validate_schema_name(kind: IdentifierKind, raw: &str) -> Result<(), IdentifierError> {
    check_placeholder(kind, raw)?;
    check_length(kind, raw, MAX_SCHEMA_NAME_LENGTH)?;
    check_chars(kind, raw, |ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | ' '))
}

/// Rejects unrendered template placeholders injected by crawlers.
fn check_placeholder(kind: IdentifierKind, raw: &str) -> Result<(), IdentifierError> {
    if raw.contains("{{") || raw.contains("}}") {
        return Err(IdentifierError::new(kind, IdentifierRejection::TemplatePlaceholder));
    }
    Ok(())
}

/// Rejects empty or overlong input.
fn check_length(kind: IdentifierKind, raw: &str, max: usize) -> Result<(), IdentifierError> {
    if raw.is_empty() {
        return Err(IdentifierError::new(kind, IdentifierRejection::Empty));
    }
    if raw.len() > max {
        return Err(IdentifierError::new(kind, IdentifierRejection::TooLong));
    }
    Ok(())
}

/// Rejects input containing characters outside the whitelist.
fn check_chars(
    kind: IdentifierKind,
    raw: &str,
    allowed: impl Fn(char) -> bool,
) -> Result<(), IdentifierError> {
    if raw.chars().all(allowed) {
        Ok(())
    } else {
        Err(IdentifierError::new(kind, IdentifierRejection::DisallowedChar))
    }
}

/// Validates a single storage key segment.
fn check_segment(kind: IdentifierKind, raw: &str) -> Result<(), IdentifierError> {
    if raw == "." || raw == ".." {
        return Err(IdentifierError::new(kind, IdentifierRejection::Reserved));
    }
    check_chars(kind, raw, |ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn clean_names_are_returned_unchanged() {
        assert_eq!(validate_user_name("alice_01").unwrap().as_str(), "alice_01");
        assert_eq!(validate_database_name("Some DB (v2).sqlite").unwrap().as_str(), "Some DB (v2).sqlite");
        assert_eq!(validate_table_name("order items").unwrap().as_str(), "order items");
    }

    #[test]
    fn schema_names_reject_sql_metacharacters() {
        for raw in ["a\"b", "a'b", "a;b", "t)--", "x*", "50%", "back\\slash"] {
            let err = validate_column_name(raw).unwrap_err();
            assert_eq!(err.rejection, IdentifierRejection::DisallowedChar, "{raw}");
        }
    }

    #[test]
    fn placeholders_are_noise() {
        let err = validate_table_name("{{ db.Tablename }}").unwrap_err();
        assert!(err.is_noise());
        let err = validate_user_name("{{ meta.Owner + '").unwrap_err();
        assert!(err.is_noise());
        let err = validate_user_name("bad name").unwrap_err();
        assert!(!err.is_noise());
    }

    #[test]
    fn reserved_names_only_block_new_accounts() {
        assert!(validate_user_name("admin").is_ok());
        let err = validate_new_user_name("Admin").unwrap_err();
        assert_eq!(err.rejection, IdentifierRejection::Reserved);
    }

    #[test]
    fn version_tags_parse_latest_and_exact() {
        assert_eq!(VersionSelector::parse("").unwrap(), VersionSelector::Latest);
        assert_eq!(VersionSelector::parse("0").unwrap(), VersionSelector::Latest);
        assert_eq!(
            VersionSelector::parse("3").unwrap(),
            VersionSelector::Exact(Version::new(3).unwrap())
        );
        assert!(VersionSelector::parse("-1").is_err());
        assert!(VersionSelector::parse("99999999999").is_err());
    }

    #[test]
    fn commit_ids_must_be_lowercase_hex() {
        let good = "a".repeat(COMMIT_ID_LENGTH);
        assert!(validate_commit_id(&good).is_ok());
        assert!(validate_commit_id(&"A".repeat(COMMIT_ID_LENGTH)).is_err());
        assert!(validate_commit_id("abc").is_err());
    }

    #[test]
    fn requester_matches_owner_case_sensitively() {
        let alice = UserName::parse("alice").unwrap();
        assert!(Requester::from_raw("alice").unwrap().is(&alice));
        assert!(!Requester::from_raw("Alice").unwrap().is(&alice));
        assert!(!Requester::from_raw("").unwrap().is(&alice));
    }
}
