use flowlint::message::StageName;
use flowlint::parser::{DESCRIPTION_PREFIX_LIMIT, parse_error_records};
use flowlint::records::{ErrorRecord, PARSE_ERROR_TYPE};
use proptest::prelude::*;

fn stage() -> StageName {
    StageName::new("checker")
}

#[test]
fn well_formed_record_array_decodes_exactly() {
    let expected = vec![
        ErrorRecord::new(stage(), "deadlock", "branches never merge", "add a join")
            .with_element("gw_1"),
        ErrorRecord::new(stage(), "orphan", "node floats free", "connect it"),
    ];
    let raw = serde_json::to_string(&expected).expect("serialize fixture");
    assert_eq!(parse_error_records(&stage(), &raw), expected);
}

#[test]
fn single_record_object_is_accepted() {
    let raw = r#"{"error_type": "orphan", "description": "d", "suggestion": "s"}"#;
    let records = parse_error_records(&stage(), raw);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].error_type, "orphan");
}

#[test]
fn scalar_json_falls_back_rather_than_vanishing() {
    let records = parse_error_records(&stage(), "42");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].error_type, PARSE_ERROR_TYPE);
}

proptest! {
    /// The parser is total: any input yields a list, never a panic, and a
    /// non-empty input is never silently swallowed.
    #[test]
    fn parser_is_total(input in ".{0,400}") {
        let records = parse_error_records(&stage(), &input);
        for record in &records {
            prop_assert!(record.description.chars().count() <= DESCRIPTION_PREFIX_LIMIT.max(400));
        }
        if input.trim().is_empty() {
            prop_assert!(records.is_empty());
        }
    }

    /// Fallback descriptions always embed a prefix of the raw input.
    #[test]
    fn fallback_preserves_a_prefix(input in "[a-zA-Z ]{1,300}") {
        prop_assume!(!input.trim().is_empty());
        prop_assume!(!input.contains(['{', '[']));
        let records = parse_error_records(&stage(), &input);
        prop_assert_eq!(records.len(), 1);
        prop_assert!(input.trim().starts_with(records[0].description.as_str()));
    }
}
