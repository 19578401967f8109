//! Address-to-agent assignment resolution against fixed roster fixtures.

use kyc_lead_api::assignment::{
    assign_agent, assign_tvt, collect_addresses, status, ROLE_FIELD_AGENT, ROLE_TVT,
};
use kyc_lead_api::canonicalizer::canonicalize;
use kyc_lead_api::errors::AppError;
use kyc_lead_api::models::{AddressOwner, Agent, Lead};
use serde_json::json;

fn field_agent(id: &str) -> Agent {
    Agent {
        id: id.to_string(),
        name: format!("Agent {}", id),
        role: ROLE_FIELD_AGENT.to_string(),
        city: "Pune".to_string(),
    }
}

fn tvt_agent(id: &str) -> Agent {
    Agent {
        id: id.to_string(),
        name: format!("TVT {}", id),
        role: ROLE_TVT.to_string(),
        city: "Pune".to_string(),
    }
}

/// 1 primary + 2 applicant secondaries + 1 co-applicant address.
fn four_address_lead() -> Lead {
    canonicalize(&json!({
        "name": "Asha",
        "hasCoApplicant": true,
        "coApplicant": {
            "name": "Ravi",
            "addresses": [{"type": "Residence", "addressLine1": "Co-app home"}]
        },
        "addresses": [
            {"type": "Residence", "addressLine1": "Primary"},
            {"type": "Office", "addressLine1": "Work"},
            {"type": "Permanent", "addressLine1": "Village"}
        ]
    }))
}

#[test]
fn collected_addresses_keep_association_order() {
    let lead = four_address_lead();
    let view = collect_addresses(&lead);

    assert_eq!(view.primary.line1, "Primary");
    assert_eq!(view.secondary.len(), 3);

    let flattened: Vec<&str> = view.addresses().iter().map(|a| a.line1.as_str()).collect();
    assert_eq!(flattened, ["Primary", "Work", "Village", "Co-app home"]);

    let applicant: Vec<&str> = view
        .owned_by(AddressOwner::Applicant)
        .iter()
        .map(|a| a.line1.as_str())
        .collect();
    assert_eq!(applicant, ["Primary", "Work", "Village"]);

    let co: Vec<&str> = view
        .owned_by(AddressOwner::CoApplicant)
        .iter()
        .map(|a| a.line1.as_str())
        .collect();
    assert_eq!(co, ["Co-app home"]);
}

#[test]
fn view_index_matches_association_position_with_tagged_mid_collection_address() {
    // An owner tag on a mid-collection entry must not reorder the view: the
    // persisted association order is [A, B, C], and assigning at view index 1
    // has to land on B, not on whichever address a by-owner grouping would
    // put there.
    let lead = canonicalize(&json!({
        "name": "Asha",
        "addresses": [
            {"type": "Residence", "addressLine1": "A"},
            {"type": "Office", "addressLine1": "B", "owner": "co_applicant"},
            {"type": "Permanent", "addressLine1": "C"}
        ]
    }));

    let persist_order: Vec<String> = std::iter::once(lead.address.line1.clone())
        .chain(
            lead.additional_details
                .as_ref()
                .unwrap()
                .addresses
                .iter()
                .map(|a| a.line1.clone()),
        )
        .collect();
    assert_eq!(persist_order, ["A", "B", "C"]);

    let mut view = collect_addresses(&lead);
    let view_order: Vec<String> = view
        .addresses()
        .iter()
        .map(|a| a.line1.to_string())
        .collect();
    assert_eq!(view_order, persist_order);

    // The tag survives; it just doesn't move the entry.
    assert_eq!(view.secondary[0].owner, AddressOwner::CoApplicant);
    assert_eq!(view.secondary[1].owner, AddressOwner::Applicant);

    assign_agent(&mut view, 1, &field_agent("a1")).unwrap();
    assert_eq!(view.secondary[0].line1, "B");
    assert_eq!(view.secondary[0].assigned_agent_id.as_deref(), Some("a1"));
    assert!(view.secondary[1].assigned_agent_id.is_none());
}

#[test]
fn three_of_four_assigned_without_tvt_is_not_fully_staffed() {
    let lead = four_address_lead();
    let mut view = collect_addresses(&lead);

    assign_agent(&mut view, 0, &field_agent("a1")).unwrap();
    assign_agent(&mut view, 1, &field_agent("a2")).unwrap();
    assign_agent(&mut view, 3, &field_agent("a3")).unwrap();

    let s = status(&view);
    assert_eq!(s.assigned_count, 3);
    assert_eq!(s.total_addresses, 4);
    assert!(!s.tvt_assigned);
    assert!(!s.fully_staffed);
}

#[test]
fn fully_staffed_requires_every_address_and_a_tvt() {
    let lead = four_address_lead();
    let mut view = collect_addresses(&lead);

    for index in 0..4 {
        assign_agent(&mut view, index, &field_agent("a1")).unwrap();
    }
    assert!(!status(&view).fully_staffed);

    assign_tvt(&mut view, &tvt_agent("t1")).unwrap();
    let s = status(&view);
    assert!(s.tvt_assigned);
    assert!(s.fully_staffed);
}

#[test]
fn role_mismatch_is_rejected_before_any_write() {
    let lead = four_address_lead();
    let mut view = collect_addresses(&lead);

    // TVT agent cannot take a field assignment.
    let result = assign_agent(&mut view, 0, &tvt_agent("t1"));
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert!(view.primary.assigned_agent_id.is_none());

    // Field agent cannot take the TVT slot.
    let result = assign_tvt(&mut view, &field_agent("a1"));
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert!(view.tvt_agent_id.is_none());
}

#[test]
fn out_of_range_index_is_rejected() {
    let lead = four_address_lead();
    let mut view = collect_addresses(&lead);

    let result = assign_agent(&mut view, 4, &field_agent("a1"));
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[test]
fn reassignment_overwrites_without_history() {
    let lead = four_address_lead();
    let mut view = collect_addresses(&lead);

    assign_agent(&mut view, 2, &field_agent("a1")).unwrap();
    assign_agent(&mut view, 2, &field_agent("a2")).unwrap();
    assert_eq!(view.secondary[1].assigned_agent_id.as_deref(), Some("a2"));

    assign_tvt(&mut view, &tvt_agent("t1")).unwrap();
    assign_tvt(&mut view, &tvt_agent("t2")).unwrap();
    assert_eq!(view.tvt_agent_id.as_deref(), Some("t2"));
}

#[test]
fn single_address_lead_counts_one() {
    let lead = canonicalize(&json!({
        "name": "Solo",
        "addresses": [{"type": "Residence", "addressLine1": "Only"}]
    }));
    let view = collect_addresses(&lead);

    let s = status(&view);
    assert_eq!(s.total_addresses, 1);
    assert_eq!(s.assigned_count, 0);
}
