//! Field-level verification reconciliation.
//!
//! Expands a lead snapshot into an exhaustive, deterministically ordered list
//! of verification fields, applies per-field edits without mutating the
//! input, and computes the aggregate outcome on commit. The committed list is
//! handed to an external collaborator for persistence; nothing here touches
//! storage.

use crate::errors::AppError;
use crate::models::{FieldPatch, Lead, VerificationField, VerificationSummary};

/// Expands a lead into the full ordered verification field list.
///
/// Fixed total ordering: identity, personal, address, contact, professional,
/// family, loan, vehicle, bank, metadata, timestamps. Blank values are still
/// emitted; a field is omitted only when the attribute does not exist on the
/// lead at all (no co-applicant record, no details bag). Each entry starts
/// unverified with `verified_value` pre-seeded to the original.
pub fn expand(lead: &Lead) -> Vec<VerificationField> {
    let mut fields = Vec::new();

    // Identity
    push(&mut fields, "id", lead.id.clone());
    push(&mut fields, "name", lead.name.clone());

    // Personal
    push(&mut fields, "age", lead.age.to_string());

    // Address (primary, then secondaries in association order)
    push_address_fields(&mut fields, "address", &lead.address);
    if let Some(details) = &lead.additional_details {
        for (i, address) in details.addresses.iter().enumerate() {
            push_address_fields(&mut fields, &format!("additional_address[{}]", i), address);
        }
    }

    // Contact
    push(&mut fields, "phone", lead.phone.clone());
    push(&mut fields, "email", lead.email.clone());

    // Professional
    if let Some(details) = &lead.additional_details {
        push(&mut fields, "company", details.company.clone());
        push(&mut fields, "designation", details.designation.clone());
        push(&mut fields, "occupation", details.occupation.clone());
        push(
            &mut fields,
            "monthly_income",
            format_amount(details.monthly_income),
        );
    }

    // Family (co-applicant)
    push(
        &mut fields,
        "has_co_applicant",
        lead.has_co_applicant.to_string(),
    );
    if let Some(co) = &lead.co_applicant {
        push(&mut fields, "co_applicant.name", co.name.clone());
        push(&mut fields, "co_applicant.age", co.age.to_string());
        push(&mut fields, "co_applicant.phone", co.phone.clone());
        push(&mut fields, "co_applicant.email", co.email.clone());
        push(&mut fields, "co_applicant.relation", co.relation.clone());
        push(&mut fields, "co_applicant.occupation", co.occupation.clone());
        push(&mut fields, "co_applicant.income", format_amount(co.income));
    }

    // Loan
    push(&mut fields, "lead_type", lead.lead_type.clone());
    if let Some(details) = &lead.additional_details {
        push(&mut fields, "loan_type", details.loan_type.clone());
        push(&mut fields, "loan_amount", format_amount(details.loan_amount));

        // Vehicle
        push(
            &mut fields,
            "vehicle_brand_name",
            details.vehicle_brand_name.clone(),
        );
        push(&mut fields, "vehicle_model", details.vehicle_model.clone());

        // Property
        push(&mut fields, "property_type", details.property_type.clone());
        push(&mut fields, "property_value", details.property_value.clone());
    }

    // Bank
    push(&mut fields, "bank", lead.bank.clone());
    if let Some(details) = &lead.additional_details {
        push(&mut fields, "bank_product", details.bank_product.clone());
    }

    // Metadata
    push(&mut fields, "status", lead.status.as_str().to_string());
    push(&mut fields, "visit_type", lead.visit_type.as_str().to_string());

    // Timestamps
    push(&mut fields, "created_at", lead.created_at.to_rfc3339());
    push(&mut fields, "updated_at", lead.updated_at.to_rfc3339());

    fields
}

fn push_address_fields(
    fields: &mut Vec<VerificationField>,
    prefix: &str,
    address: &crate::models::Address,
) {
    push(
        fields,
        &format!("{}.type", prefix),
        address.kind.as_str().to_string(),
    );
    push(fields, &format!("{}.line1", prefix), address.line1.clone());
    push(fields, &format!("{}.city", prefix), address.city.clone());
    push(
        fields,
        &format!("{}.district", prefix),
        address.district.clone(),
    );
    push(fields, &format!("{}.state", prefix), address.state.clone());
    push(
        fields,
        &format!("{}.pincode", prefix),
        address.pincode.clone(),
    );
}

fn push(fields: &mut Vec<VerificationField>, name: &str, original: String) {
    fields.push(VerificationField {
        field_name: name.to_string(),
        verified_value: original.clone(),
        original_value: original,
        is_verified: false,
        is_correct: false,
        notes: String::new(),
    });
}

/// Whole numbers render without a trailing fraction so originals read the
/// way agents submitted them.
fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{}", amount)
    }
}

/// Applies a single-field edit, returning a new list.
///
/// Pure and non-mutating: entries other than `index` are untouched, so
/// concurrent edits to different indices never race.
pub fn set_field(
    fields: &[VerificationField],
    index: usize,
    patch: &FieldPatch,
) -> Result<Vec<VerificationField>, AppError> {
    if index >= fields.len() {
        return Err(AppError::BadRequest(format!(
            "Field index {} out of range ({} fields)",
            index,
            fields.len()
        )));
    }

    let mut updated = fields.to_vec();
    let entry = &mut updated[index];

    if let Some(value) = &patch.verified_value {
        entry.verified_value = value.clone();
    }
    if let Some(verified) = patch.is_verified {
        entry.is_verified = verified;
    }
    if let Some(correct) = patch.is_correct {
        entry.is_correct = correct;
    }
    if let Some(notes) = &patch.notes {
        entry.notes = notes.clone();
    }

    Ok(updated)
}

/// Commits a verification pass and returns the aggregate counters.
///
/// Fails when zero fields are verified. `is_correct` on an unverified entry
/// counts toward neither bucket, so `correct + incorrect == verified` always
/// holds.
pub fn commit(fields: &[VerificationField]) -> Result<VerificationSummary, AppError> {
    let verified = fields.iter().filter(|f| f.is_verified).count();
    if verified == 0 {
        return Err(AppError::NoFieldsVerified);
    }

    let correct = fields
        .iter()
        .filter(|f| f.is_verified && f.is_correct)
        .count();

    Ok(VerificationSummary {
        total: fields.len(),
        verified,
        correct,
        incorrect: verified - correct,
    })
}
