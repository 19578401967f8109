//! Verification expansion, field edits and commit aggregation.

use kyc_lead_api::canonicalizer::canonicalize;
use kyc_lead_api::errors::AppError;
use kyc_lead_api::models::FieldPatch;
use kyc_lead_api::verification::{commit, expand, set_field};
use serde_json::json;

fn field_names(lead_payload: serde_json::Value) -> Vec<String> {
    let lead = canonicalize(&lead_payload);
    expand(&lead).into_iter().map(|f| f.field_name).collect()
}

#[test]
fn expand_emits_fixed_order() {
    let names = field_names(json!({
        "name": "Asha",
        "phone": "9876543210",
        "addresses": [
            {"type": "Residence", "addressLine1": "12 MG Road"},
            {"type": "Office", "addressLine1": "IT Park"}
        ]
    }));

    let expected_prefix = [
        "id",
        "name",
        "age",
        "address.type",
        "address.line1",
        "address.city",
        "address.district",
        "address.state",
        "address.pincode",
        "additional_address[0].type",
        "additional_address[0].line1",
        "additional_address[0].city",
        "additional_address[0].district",
        "additional_address[0].state",
        "additional_address[0].pincode",
        "phone",
        "email",
    ];
    assert_eq!(&names[..expected_prefix.len()], expected_prefix);

    // Timestamps always close the list.
    assert_eq!(names[names.len() - 2], "created_at");
    assert_eq!(names[names.len() - 1], "updated_at");
}

#[test]
fn expand_emits_blank_values_but_omits_absent_records() {
    // No co-applicant record: the co_applicant.* block is omitted entirely,
    // but the flag itself is a lead scalar and is always emitted.
    let names = field_names(json!({"name": "Asha"}));
    assert!(names.iter().all(|n| !n.starts_with("co_applicant.")));
    assert!(names.contains(&"has_co_applicant".to_string()));

    // Blank email is still a field with an empty original value.
    let lead = canonicalize(&json!({"name": "Asha"}));
    let fields = expand(&lead);
    let email = fields.iter().find(|f| f.field_name == "email").unwrap();
    assert_eq!(email.original_value, "");
    assert_eq!(email.verified_value, "");
    assert!(!email.is_verified);
}

#[test]
fn expand_includes_co_applicant_block_when_present() {
    let names = field_names(json!({
        "hasCoApplicant": true,
        "coApplicant": {"name": "Ravi", "relation": "Brother"}
    }));

    for expected in [
        "has_co_applicant",
        "co_applicant.name",
        "co_applicant.age",
        "co_applicant.phone",
        "co_applicant.email",
        "co_applicant.relation",
        "co_applicant.occupation",
        "co_applicant.income",
    ] {
        assert!(names.contains(&expected.to_string()), "missing {expected}");
    }
}

#[test]
fn set_field_does_not_mutate_input() {
    let lead = canonicalize(&json!({"name": "Asha"}));
    let fields = expand(&lead);
    let snapshot = fields.clone();

    let patch = FieldPatch {
        verified_value: Some("Asha K".to_string()),
        is_verified: Some(true),
        is_correct: Some(false),
        notes: Some("Name differs on Aadhaar".to_string()),
    };
    let updated = set_field(&fields, 1, &patch).unwrap();

    assert_eq!(fields, snapshot);
    assert_eq!(updated[1].verified_value, "Asha K");
    assert!(updated[1].is_verified);
    assert!(!updated[1].is_correct);
    assert_eq!(updated[1].notes, "Name differs on Aadhaar");

    // All other entries untouched.
    for (i, entry) in updated.iter().enumerate() {
        if i != 1 {
            assert_eq!(entry, &snapshot[i]);
        }
    }
}

#[test]
fn set_field_rejects_out_of_range_index() {
    let lead = canonicalize(&json!({}));
    let fields = expand(&lead);

    let result = set_field(&fields, fields.len(), &FieldPatch::default());
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[test]
fn commit_requires_at_least_one_verified_field() {
    let lead = canonicalize(&json!({"name": "Asha"}));
    let fields = expand(&lead);

    // Freshly expanded: nothing verified.
    assert!(matches!(commit(&fields), Err(AppError::NoFieldsVerified)));
    // Empty list: same guard.
    assert!(matches!(commit(&[]), Err(AppError::NoFieldsVerified)));
}

#[test]
fn commit_counts_only_verified_fields() {
    let lead = canonicalize(&json!({"name": "Asha"}));
    let mut fields = expand(&lead);
    let total = fields.len();

    // Verify three fields: two correct, one incorrect.
    for (index, correct) in [(0, true), (1, true), (2, false)] {
        fields = set_field(
            &fields,
            index,
            &FieldPatch {
                is_verified: Some(true),
                is_correct: Some(correct),
                ..Default::default()
            },
        )
        .unwrap();
    }

    // A stray is_correct on an unverified field counts toward neither bucket.
    fields = set_field(
        &fields,
        3,
        &FieldPatch {
            is_correct: Some(true),
            ..Default::default()
        },
    )
    .unwrap();

    let summary = commit(&fields).unwrap();
    assert_eq!(summary.total, total);
    assert_eq!(summary.verified, 3);
    assert_eq!(summary.correct, 2);
    assert_eq!(summary.incorrect, 1);
}
