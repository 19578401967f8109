use std::env;

use kyc_lead_api::canonicalizer::canonicalize;
use kyc_lead_api::db::Database;
use kyc_lead_api::lead_storage::LeadStorage;
use kyc_lead_api::models::{AddressKind, AddressOwner, AddressPatch, DetailsPatch, LeadPatch};
use kyc_lead_api::reconciler::LeadReconciler;
use serde_json::json;

/// Integration smoke test for the persist/hydrate round trip.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn persist_then_hydrate_round_trip() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;
    let storage = LeadStorage::new(db.pool.clone());

    // Generated id is unique per run, so repeated runs never collide.
    let lead = canonicalize(&json!({
        "name": "Smoke Test Applicant",
        "age": 34,
        "phone": "9876543210",
        "leadType": "Home Loan",
        "bank": {"id": "hdfc"},
        "hasCoApplicant": true,
        "coApplicant": {
            "name": "Smoke Co-Applicant",
            "relation": "Spouse",
            "addresses": [{"type": "Office", "addressLine1": "Co Tower"}]
        },
        "addresses": [
            {"type": "Residence", "addressLine1": "1 Smoke Lane", "city": "Pune", "pincode": "411001"},
            {"type": "Office", "addressLine1": "2 Work Street", "city": "Pune"}
        ]
    }));

    let id = storage.persist(&lead).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(id, lead.id);

    let hydrated = storage
        .hydrate(&id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    assert_eq!(hydrated.name, "Smoke Test Applicant");
    assert_eq!(hydrated.bank, "hdfc");
    assert_eq!(hydrated.address.kind, AddressKind::Residence);
    assert_eq!(hydrated.address.line1, "1 Smoke Lane");
    assert!(hydrated.has_co_applicant);

    let details = hydrated
        .additional_details
        .as_ref()
        .expect("details row persisted");
    assert_eq!(details.addresses.len(), 2);
    assert_eq!(details.addresses[0].line1, "2 Work Street");
    assert_eq!(details.addresses[0].owner, AddressOwner::Applicant);
    assert_eq!(details.addresses[1].line1, "Co Tower");
    assert_eq!(details.addresses[1].owner, AddressOwner::CoApplicant);

    // Cleanup so repeated runs stay tidy.
    storage
        .delete(&id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    Ok(())
}

/// Integration smoke test for sparse partial updates.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn sparse_patch_round_trip() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;
    let storage = LeadStorage::new(db.pool.clone());
    let reconciler = LeadReconciler::new(db.pool.clone());

    let lead = canonicalize(&json!({
        "name": "Patch Applicant",
        "age": 40,
        "phone": "9876543210",
        "leadType": "Home Loan",
        "bank": {"id": "hdfc"},
        "companyName": "Original Co",
        "designation": "Analyst",
        "addresses": [{"type": "Residence", "addressLine1": "Old Lane", "city": "Pune"}]
    }));
    let id = storage
        .persist(&lead)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // Sparse patch: unknown bank name slugs deterministically, name changes,
    // everything absent from the patch survives untouched.
    let patch = LeadPatch {
        name: Some("Renamed Applicant".to_string()),
        bank: Some("Totally New Bank".to_string()),
        address: Some(AddressPatch {
            line1: Some("New Lane".to_string()),
            ..Default::default()
        }),
        additional_details: Some(DetailsPatch {
            company: Some("Patched Co".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };
    reconciler
        .apply_update(&id, &patch)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let patched = storage
        .hydrate(&id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(patched.name, "Renamed Applicant");
    assert_eq!(patched.bank, "totally_new_bank");
    assert_eq!(patched.phone, "9876543210");
    assert_eq!(patched.lead_type, "Home Loan");
    assert_eq!(patched.age, 40);
    assert_eq!(patched.address.line1, "New Lane");
    assert_eq!(patched.address.city, "Pune");

    let details = patched
        .additional_details
        .as_ref()
        .expect("details row persisted");
    assert_eq!(details.company, "Patched Co");
    assert_eq!(details.designation, "Analyst");

    // Failure asymmetry: break the primary-address reference so the nested
    // address step fails; the call still succeeds and the lead row is
    // updated, only the address step is swallowed.
    sqlx::query("UPDATE kyc.leads SET primary_address_id = NULL WHERE id = $1")
        .bind(&id)
        .execute(&db.pool)
        .await?;

    let patch = LeadPatch {
        name: Some("Renamed Again".to_string()),
        address: Some(AddressPatch {
            line1: Some("Unreachable Lane".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };
    reconciler
        .apply_update(&id, &patch)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let after = storage
        .hydrate(&id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(after.name, "Renamed Again");
    assert_eq!(after.address.line1, "New Lane");

    storage
        .delete(&id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    Ok(())
}
