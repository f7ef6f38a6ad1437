// crates/tablehub-core/tests/properties.rs
// ============================================================================
// Module: Property Tests
// Description: Property-based coverage for identifiers and cache fingerprints.
// Purpose: Ensure validators and fingerprints hold across generated inputs.
// Dependencies: tablehub-core, proptest
// ============================================================================
//! ## Overview
//! Validators must return clean input unchanged and reject every string that
//! carries an SQL metacharacter. Fingerprints must be shared by every
//! non-owner requester and differ for the owner.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use tablehub_core::ColumnName;
use tablehub_core::DatabaseName;
use tablehub_core::FingerprintInput;
use tablehub_core::IdentifierRejection;
use tablehub_core::QueryShape;
use tablehub_core::Requester;
use tablehub_core::TableName;
use tablehub_core::UserName;
use tablehub_core::Version;
use tablehub_core::validate_column_name;
use tablehub_core::validate_table_name;
use tablehub_core::validate_user_name;

proptest! {
    #[test]
    fn clean_schema_names_are_returned_unchanged(raw in "[A-Za-z0-9_. -]{1,63}") {
        let table = validate_table_name(&raw).unwrap();
        prop_assert_eq!(table.as_str(), raw.as_str());
    }

    #[test]
    fn schema_names_with_metacharacters_are_rejected(
        prefix in "[a-z]{0,10}",
        meta in prop::sample::select(vec!['"', '\'', ';', '(', ')', '*', '%', '\\', '`', '[', ']']),
        suffix in "[a-z]{0,10}",
    ) {
        let raw = format!("{prefix}{meta}{suffix}");
        let err = validate_column_name(&raw).unwrap_err();
        prop_assert_eq!(err.rejection, IdentifierRejection::DisallowedChar);
    }

    #[test]
    fn overlong_user_names_are_rejected(raw in "[a-z]{64,80}") {
        let err = validate_user_name(&raw).unwrap_err();
        prop_assert_eq!(err.rejection, IdentifierRejection::TooLong);
    }

    #[test]
    fn non_owner_requesters_share_one_fingerprint(
        requester in "[a-z][a-z0-9]{0,20}",
        x in "[a-z]{1,10}",
        y in "[a-z]{1,10}",
    ) {
        prop_assume!(requester != "alice");
        let owner = UserName::parse("alice").unwrap();
        let database = DatabaseName::parse("d").unwrap();
        let table = TableName::parse("t").unwrap();
        let shape = QueryShape::Projection {
            x: ColumnName::parse(&x).unwrap(),
            y: ColumnName::parse(&y).unwrap(),
            filter: None,
        };
        let key = |who: &Requester| {
            FingerprintInput {
                owner: &owner,
                database: &database,
                version: Version::FIRST,
                table: Some(&table),
                shape: &shape,
                requester: who,
            }
            .fingerprint()
        };
        let anonymous = key(&Requester::Anonymous);
        let other = key(&Requester::User(UserName::parse(&requester).unwrap()));
        let own = key(&Requester::User(owner.clone()));
        prop_assert_eq!(&anonymous, &other);
        prop_assert_ne!(&anonymous, &own);
    }
}
