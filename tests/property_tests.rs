/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use proptest::prelude::*;
use serde_json::{json, Value};

use kyc_lead_api::canonicalizer::{canonicalize, validate_in_phone};
use kyc_lead_api::models::{FieldPatch, VerificationField};
use kyc_lead_api::reconciler::bank_identifier;
use kyc_lead_api::verification::{commit, set_field};

// Property: canonicalization is total, it must never panic and must always
// produce a structurally valid lead
proptest! {
    #[test]
    fn canonicalize_never_panics_on_arbitrary_strings(
        name in "\\PC*",
        phone in "\\PC*",
        lead_type in "\\PC*"
    ) {
        let lead = canonicalize(&json!({
            "name": name,
            "phone": phone,
            "leadType": lead_type
        }));
        prop_assert!(!lead.id.is_empty());
        prop_assert!(lead.additional_details.is_some());
    }

    #[test]
    fn canonicalize_tolerates_arbitrary_scalar_payloads(n in any::<i64>(), flag in any::<bool>()) {
        for payload in [json!(n), json!(flag), Value::Null, json!({"age": n, "hasCoApplicant": flag})] {
            let lead = canonicalize(&payload);
            // The co-applicant invariant holds for every input shape.
            prop_assert_eq!(lead.has_co_applicant, lead.co_applicant.is_some());
        }
    }
}

// Property: phone validation never panics
proptest! {
    #[test]
    fn phone_validation_never_panics(phone in "\\PC*") {
        let _ = validate_in_phone(&phone);
    }

    #[test]
    fn valid_in_mobiles_normalize_to_e164(number in 6000000000u64..=9999999999u64) {
        let (valid, normalized) = validate_in_phone(&number.to_string());
        if valid {
            prop_assert!(normalized.starts_with("+91"));
            prop_assert!(normalized[1..].chars().all(|c| c.is_ascii_digit()));
        }
    }
}

// Property: the commit counters are consistent for any flag combination
proptest! {
    #[test]
    fn commit_counters_are_consistent(flags in proptest::collection::vec((any::<bool>(), any::<bool>()), 1..40)) {
        let fields: Vec<VerificationField> = flags
            .iter()
            .enumerate()
            .map(|(i, (verified, correct))| VerificationField {
                field_name: format!("field_{}", i),
                original_value: "x".to_string(),
                verified_value: "x".to_string(),
                is_verified: *verified,
                is_correct: *correct,
                notes: String::new(),
            })
            .collect();

        match commit(&fields) {
            Ok(summary) => {
                prop_assert_eq!(summary.total, fields.len());
                prop_assert_eq!(summary.correct + summary.incorrect, summary.verified);
                prop_assert!(summary.verified <= summary.total);
            }
            Err(_) => {
                // Only the zero-verified case may fail.
                prop_assert!(fields.iter().all(|f| !f.is_verified));
            }
        }
    }

    #[test]
    fn set_field_preserves_length_and_other_entries(
        len in 1usize..20,
        index in 0usize..20,
        value in "\\PC{0,30}"
    ) {
        let fields: Vec<VerificationField> = (0..len)
            .map(|i| VerificationField {
                field_name: format!("field_{}", i),
                original_value: "orig".to_string(),
                verified_value: "orig".to_string(),
                is_verified: false,
                is_correct: false,
                notes: String::new(),
            })
            .collect();

        let patch = FieldPatch {
            verified_value: Some(value),
            ..Default::default()
        };

        match set_field(&fields, index, &patch) {
            Ok(updated) => {
                prop_assert!(index < len);
                prop_assert_eq!(updated.len(), fields.len());
                for (i, entry) in updated.iter().enumerate() {
                    if i != index {
                        prop_assert_eq!(entry, &fields[i]);
                    }
                }
            }
            Err(_) => prop_assert!(index >= len),
        }
    }
}

// Property: bank identifier resolution is deterministic and idempotent
proptest! {
    #[test]
    fn bank_identifier_never_panics(name in "\\PC*") {
        let _ = bank_identifier(&name);
    }

    #[test]
    fn bank_identifier_is_deterministic(name in "[A-Za-z ]{1,40}") {
        prop_assert_eq!(bank_identifier(&name), bank_identifier(&name));
    }

    #[test]
    fn slug_fallback_has_no_whitespace(name in "[A-Za-z][A-Za-z ]{0,40}") {
        let id = bank_identifier(&name);
        prop_assert!(!id.contains(' '));
        prop_assert_eq!(id.to_lowercase(), id.clone());
        // Resolving a slug again yields the same slug.
        prop_assert_eq!(bank_identifier(&id), id);
    }
}
