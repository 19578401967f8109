//! Lead canonicalization: one fixed `Lead` shape out of whatever the intake
//! UI happened to assemble (multi-step wizard state, single-page form state,
//! or a test fixture).
//!
//! Every field has a defined fallback, so malformed or partially-absent input
//! always yields a structurally valid lead. This function must never fail.

use crate::models::{
    AdditionalDetails, Address, AddressKind, AddressOwner, CoApplicant, IntakePayload, Lead,
    LeadStatus, VisitType,
};
use chrono::Utc;
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Default age when the submitted value is absent or non-numeric.
const DEFAULT_AGE: u32 = 25;

/// Canonicalizes a loosely-structured intake payload into a `Lead`.
///
/// Pure transform, no I/O. Several logical fields accept more than one
/// historical key name; the alias lists below are evaluated in fixed
/// precedence order, the more specific key first.
pub fn canonicalize(payload: &IntakePayload) -> Lead {
    let now = Utc::now();

    let id = first_str(payload, &["id", "leadId", "lead_id"]);
    let id = if id.is_empty() { generate_lead_id() } else { id };

    let (primary, secondary) = split_addresses(payload);

    let has_co_applicant = truthy(payload.get("hasCoApplicant"))
        || truthy(payload.get("has_co_applicant"));

    let co_applicant = if has_co_applicant {
        Some(parse_co_applicant(payload))
    } else {
        None
    };

    Lead {
        id,
        name: first_str(payload, &["name", "applicantName", "customerName"]),
        age: parse_age(payload.get("age")),
        phone: select_primary_phone(payload),
        email: first_str(payload, &["email", "emailAddress"]),
        lead_type: first_str(payload, &["leadType", "lead_type"]),
        bank: parse_bank(payload.get("bank")),
        address: primary,
        has_co_applicant,
        co_applicant,
        additional_details: Some(parse_details(payload, secondary)),
        status: LeadStatus::Pending,
        visit_type: VisitType::from_free_text(&first_str(
            payload,
            &["visitType", "visit_type", "visitMode"],
        )),
        tvt_agent_id: None,
        created_at: now,
        updated_at: now,
    }
}

/// Generates a lead identifier from a millisecond timestamp plus a random
/// suffix. Collision-safe for rapid successive calls from one caller; not
/// intended to survive adversarial multi-writer conditions.
pub fn generate_lead_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("LEAD-{}-{}", millis, &suffix[..6])
}

/// Splits the submitted address collection into (primary, secondary).
///
/// Element 0 is always the primary; an empty collection synthesizes a blank
/// Residence address. Co-applicant addresses submitted under the co-applicant
/// sub-object are appended to the secondary list with their owner tag set.
fn split_addresses(payload: &Value) -> (Address, Vec<Address>) {
    let mut all: Vec<Address> = payload
        .get("addresses")
        .and_then(|a| a.as_array())
        .map(|entries| {
            entries
                .iter()
                .map(|e| parse_address(e, AddressOwner::Applicant))
                .collect()
        })
        .unwrap_or_default();

    let primary = if all.is_empty() {
        Address::blank(AddressKind::Residence, AddressOwner::Applicant)
    } else {
        let mut first = all.remove(0);
        // The primary address always belongs to the applicant.
        first.owner = AddressOwner::Applicant;
        first
    };

    let co_addresses = payload
        .get("coApplicant")
        .and_then(|c| c.get("addresses"))
        .or_else(|| payload.get("coApplicantAddresses"))
        .and_then(|a| a.as_array());

    if let Some(entries) = co_addresses {
        for entry in entries {
            all.push(parse_address(entry, AddressOwner::CoApplicant));
        }
    }

    (primary, all)
}

/// Parses one address entry. Unknown declared types coerce to Residence.
fn parse_address(entry: &Value, default_owner: AddressOwner) -> Address {
    let owner = entry
        .get("owner")
        .and_then(|v| v.as_str())
        .map(AddressOwner::parse_or_applicant)
        .unwrap_or(default_owner);

    Address {
        kind: AddressKind::parse_or_residence(&first_str(entry, &["type", "kind"])),
        line1: first_str(entry, &["addressLine1", "street", "line1"]),
        city: first_str(entry, &["city"]),
        district: first_str(entry, &["district", "area"]),
        state: first_str(entry, &["state"]),
        pincode: first_str(entry, &["pincode", "zipCode", "zip"]),
        owner,
        assigned_agent_id: None,
    }
}

/// Primary phone selection: a primary-flagged entry with a non-empty number
/// wins; otherwise the first entry; otherwise the legacy flat `phone` field.
///
/// "First entry" means first entry with a non-empty number: a `phones` array
/// whose head carries no usable number falls through to the flat field
/// rather than yielding an empty phone. Resolution of an ambiguity in the
/// historical precedence; kept because it recovers more submissions.
fn select_primary_phone(payload: &Value) -> String {
    if let Some(phones) = payload.get("phones").and_then(|p| p.as_array()) {
        let flagged = phones.iter().find(|entry| {
            let is_primary = truthy(entry.get("isPrimary"))
                || truthy(entry.get("is_primary"))
                || truthy(entry.get("primary"));
            is_primary && !first_str(entry, &["number", "phone"]).is_empty()
        });

        if let Some(entry) = flagged {
            return first_str(entry, &["number", "phone"]);
        }

        if let Some(entry) = phones.first() {
            let number = first_str(entry, &["number", "phone"]);
            if !number.is_empty() {
                return number;
            }
        }
    }

    first_str(payload, &["phone"])
}

/// The bank selector may arrive as an object carrying a stable `id` or as a
/// plain name string; the typed key wins.
fn parse_bank(value: Option<&Value>) -> String {
    match value {
        Some(v) => {
            if let Some(id) = v.get("id").and_then(|i| i.as_str()) {
                id.to_string()
            } else {
                v.as_str().unwrap_or_default().to_string()
            }
        }
        None => String::new(),
    }
}

/// Co-applicant sub-record; every field defaults independently.
fn parse_co_applicant(payload: &Value) -> CoApplicant {
    let co = payload
        .get("coApplicant")
        .or_else(|| payload.get("co_applicant"))
        .cloned()
        .unwrap_or(Value::Null);

    CoApplicant {
        name: first_str(&co, &["name"]),
        age: co
            .get("age")
            .map(|v| parse_u32_or(v, 0))
            .unwrap_or_default(),
        phone: first_str(&co, &["phone", "number"]),
        email: first_str(&co, &["email"]),
        relation: first_str(&co, &["relation", "relationship"]),
        occupation: first_str(&co, &["occupation"]),
        income: parse_money(co.get("income")),
    }
}

/// Builds the additional-details bag. Every known field is present and
/// defaulted; the `extra` map carries attributes not yet promoted.
fn parse_details(payload: &Value, addresses: Vec<Address>) -> AdditionalDetails {
    let extra: HashMap<String, String> = payload
        .get("extra")
        .and_then(|e| e.as_object())
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    AdditionalDetails {
        addresses,
        company: first_str(payload, &["companyName", "company"]),
        designation: first_str(payload, &["designation"]),
        occupation: first_str(payload, &["occupation"]),
        monthly_income: parse_money(
            payload
                .get("monthlyIncome")
                .or_else(|| payload.get("monthly_income"))
                .or_else(|| payload.get("income")),
        ),
        property_type: first_str(payload, &["propertyType", "property_type"]),
        property_value: first_str(payload, &["propertyValue", "property_value"]),
        vehicle_brand_name: first_str(payload, &["vehicleBrandName", "vehicleBrand"]),
        vehicle_model: first_str(payload, &["vehicleModel", "vehicle_model"]),
        bank_product: first_str(payload, &["bankProduct", "product"]),
        loan_type: first_str(payload, &["loanType", "loan_type"]),
        loan_amount: parse_money(
            payload
                .get("loanAmount")
                .or_else(|| payload.get("loan_amount")),
        ),
        extra,
    }
}

/// Returns the first non-empty string among the alias keys, else "".
fn first_str(obj: &Value, keys: &[&str]) -> String {
    for key in keys {
        if let Some(s) = obj.get(key).and_then(|v| v.as_str()) {
            if !s.is_empty() {
                return s.to_string();
            }
        }
    }
    String::new()
}

/// Truthiness of a flag that may arrive as bool, number or string.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        Some(Value::String(s)) => {
            let lower = s.trim().to_lowercase();
            lower == "true" || lower == "yes" || lower == "1"
        }
        _ => false,
    }
}

/// Age may arrive as a number or a numeric string; anything else falls back
/// to the domain default of 25.
fn parse_age(value: Option<&Value>) -> u32 {
    value
        .map(|v| parse_u32_or(v, DEFAULT_AGE))
        .unwrap_or(DEFAULT_AGE)
}

fn parse_u32_or(value: &Value, fallback: u32) -> u32 {
    match value {
        Value::Number(n) => n.as_u64().map(|v| v as u32).unwrap_or(fallback),
        Value::String(s) => s.trim().parse::<u32>().unwrap_or(fallback),
        _ => fallback,
    }
}

/// Monetary amounts may arrive as numbers or numeric strings; fallback 0.
fn parse_money(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().replace(',', "").parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Validate and normalize an Indian phone number.
///
/// Parses with region IN and returns the E.164 form when valid. Used by the
/// intake handler to warn about implausible numbers; canonicalization itself
/// never rejects a phone.
pub fn validate_in_phone(raw: &str) -> (bool, String) {
    if raw.trim().is_empty() || raw.len() < 8 {
        return (false, "Phone too short".to_string());
    }

    match phonenumber::parse(Some(CountryId::IN), raw) {
        Ok(number) => {
            if phonenumber::is_valid(&number) {
                let formatted = number.format().mode(Mode::E164).to_string();
                (true, formatted)
            } else {
                (false, "Invalid Indian phone number".to_string())
            }
        }
        Err(e) => (false, format!("Parse error: {:?}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alias_precedence_prefers_specific_key() {
        let entry = json!({"addressLine1": "12 MG Road", "street": "ignored"});
        assert_eq!(first_str(&entry, &["addressLine1", "street"]), "12 MG Road");

        let entry = json!({"street": "fallback street"});
        assert_eq!(
            first_str(&entry, &["addressLine1", "street"]),
            "fallback street"
        );

        let entry = json!({});
        assert_eq!(first_str(&entry, &["addressLine1", "street"]), "");
    }

    #[test]
    fn age_falls_back_to_25() {
        assert_eq!(parse_age(Some(&json!(40))), 40);
        assert_eq!(parse_age(Some(&json!("33"))), 33);
        assert_eq!(parse_age(Some(&json!("not a number"))), 25);
        assert_eq!(parse_age(Some(&json!(null))), 25);
        assert_eq!(parse_age(None), 25);
    }

    #[test]
    fn bank_object_id_wins_over_name() {
        assert_eq!(parse_bank(Some(&json!({"id": "hdfc", "name": "HDFC Bank"}))), "hdfc");
        assert_eq!(parse_bank(Some(&json!("HDFC Bank"))), "HDFC Bank");
        assert_eq!(parse_bank(None), "");
    }

    #[test]
    fn truthy_accepts_legacy_flag_shapes() {
        assert!(truthy(Some(&json!(true))));
        assert!(truthy(Some(&json!(1))));
        assert!(truthy(Some(&json!("yes"))));
        assert!(!truthy(Some(&json!("no"))));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(None));
    }
}
