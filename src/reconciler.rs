//! Partial-update reconciliation: sparse PATCH semantics over a persisted
//! lead. Only fields present in the patch are written.
//!
//! Failure asymmetry, preserved from the observed behavior of this system:
//! the top-level lead-row update aborts the call on error; nested steps
//! (primary-address update, details upsert) log a warning and continue, so a
//! partially-applied update still leaves the lead row correct.

use crate::errors::{AppError, ResultExt};
use crate::models::LeadPatch;
use regex::Regex;
use sqlx::PgPool;
use std::sync::OnceLock;
use uuid::Uuid;

/// Known bank names and their stable identifiers. Lookup is
/// case-insensitive on the name.
const BANK_DIRECTORY: &[(&str, &str)] = &[
    ("HDFC Bank", "hdfc"),
    ("ICICI Bank", "icici"),
    ("State Bank of India", "sbi"),
    ("Axis Bank", "axis"),
    ("Kotak Mahindra Bank", "kotak"),
    ("Punjab National Bank", "pnb"),
    ("Bank of Baroda", "bob"),
    ("Canara Bank", "canara"),
    ("IDFC First Bank", "idfc_first"),
    ("Yes Bank", "yes_bank"),
    ("IndusInd Bank", "indusind"),
];

/// Translates a human-readable bank name to its stable identifier.
///
/// Unknown names fall back to a deterministic slug (lowercase, whitespace
/// runs replaced with underscores) so the same unrecognized name always maps
/// to the same identifier.
pub fn bank_identifier(name: &str) -> String {
    let trimmed = name.trim();
    for (known, id) in BANK_DIRECTORY {
        if known.eq_ignore_ascii_case(trimmed) {
            return (*id).to_string();
        }
    }
    slugify(trimmed)
}

fn slugify(name: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap());
    whitespace.replace_all(name, "_").to_lowercase()
}

/// Applies partial field updates to an existing persisted lead.
pub struct LeadReconciler {
    pool: PgPool,
}

impl LeadReconciler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies a sparse update. Absent patch fields leave storage untouched.
    ///
    /// Only the lead-row update can fail the call; address and details
    /// sub-steps are logged and swallowed on failure.
    pub async fn apply_update(&self, lead_id: &str, patch: &LeadPatch) -> Result<(), AppError> {
        let bank = patch.bank.as_deref().map(bank_identifier);

        let result = sqlx::query(
            r#"
            UPDATE kyc.leads
            SET name = COALESCE($2, name),
                age = COALESCE($3, age),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                lead_type = COALESCE($6, lead_type),
                bank = COALESCE($7, bank),
                status = COALESCE($8, status),
                visit_type = COALESCE($9, visit_type),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(lead_id)
        .bind(&patch.name)
        .bind(patch.age.map(|a| a as i32))
        .bind(&patch.phone)
        .bind(&patch.email)
        .bind(&patch.lead_type)
        .bind(bank)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.visit_type.map(|v| v.as_str()))
        .execute(&self.pool)
        .await
        .context("apply update: update lead row")?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Lead with id {} not found",
                lead_id
            )));
        }

        if patch.address.is_some() {
            if let Err(e) = self.update_primary_address(lead_id, patch).await {
                tracing::warn!("Primary address update failed for lead {}: {}", lead_id, e);
            }
        }

        if patch.additional_details.is_some() {
            if let Err(e) = self.upsert_details(lead_id, patch).await {
                tracing::warn!("Details upsert failed for lead {}: {}", lead_id, e);
            }
        }

        tracing::info!("Applied partial update to lead {}", lead_id);
        Ok(())
    }

    /// Resolves the lead's primary-address foreign key and updates that
    /// address row in place. Never re-points the foreign key.
    async fn update_primary_address(
        &self,
        lead_id: &str,
        patch: &LeadPatch,
    ) -> Result<(), AppError> {
        let address = match &patch.address {
            Some(a) => a,
            None => return Ok(()),
        };

        let primary: Option<Uuid> = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT primary_address_id FROM kyc.leads WHERE id = $1",
        )
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await
        .context("apply update: resolve primary address")?
        .flatten();

        let address_id = primary.ok_or_else(|| {
            AppError::NotFound(format!("Lead {} has no primary address reference", lead_id))
        })?;

        sqlx::query(
            r#"
            UPDATE kyc.addresses
            SET line1 = COALESCE($2, line1),
                city = COALESCE($3, city),
                district = COALESCE($4, district),
                state = COALESCE($5, state),
                pincode = COALESCE($6, pincode)
            WHERE id = $1
            "#,
        )
        .bind(address_id)
        .bind(&address.line1)
        .bind(&address.city)
        .bind(&address.district)
        .bind(&address.state)
        .bind(&address.pincode)
        .execute(&self.pool)
        .await
        .context("apply update: update primary address row")?;

        Ok(())
    }

    /// Upserts the additional-details row: created with defaults when the
    /// lead has none yet, otherwise patched in place.
    async fn upsert_details(&self, lead_id: &str, patch: &LeadPatch) -> Result<(), AppError> {
        let details = match &patch.additional_details {
            Some(d) => d,
            None => return Ok(()),
        };

        sqlx::query(
            r#"
            INSERT INTO kyc.additional_details (
                lead_id, company, designation, occupation, monthly_income,
                property_type, property_value, vehicle_brand_name,
                vehicle_model, bank_product, loan_type, loan_amount, extra,
                created_at, updated_at
            )
            VALUES ($1, COALESCE($2, ''), COALESCE($3, ''), COALESCE($4, ''),
                    COALESCE($5, 0), COALESCE($6, ''), COALESCE($7, ''),
                    COALESCE($8, ''), COALESCE($9, ''), COALESCE($10, ''),
                    COALESCE($11, ''), COALESCE($12, 0), '{}'::jsonb, now(), now())
            ON CONFLICT (lead_id) DO UPDATE
            SET company = COALESCE($2, additional_details.company),
                designation = COALESCE($3, additional_details.designation),
                occupation = COALESCE($4, additional_details.occupation),
                monthly_income = COALESCE($5, additional_details.monthly_income),
                property_type = COALESCE($6, additional_details.property_type),
                property_value = COALESCE($7, additional_details.property_value),
                vehicle_brand_name = COALESCE($8, additional_details.vehicle_brand_name),
                vehicle_model = COALESCE($9, additional_details.vehicle_model),
                bank_product = COALESCE($10, additional_details.bank_product),
                loan_type = COALESCE($11, additional_details.loan_type),
                loan_amount = COALESCE($12, additional_details.loan_amount),
                updated_at = now()
            "#,
        )
        .bind(lead_id)
        .bind(&details.company)
        .bind(&details.designation)
        .bind(&details.occupation)
        .bind(details.monthly_income)
        .bind(&details.property_type)
        .bind(&details.property_value)
        .bind(&details.vehicle_brand_name)
        .bind(&details.vehicle_model)
        .bind(&details.bank_product)
        .bind(&details.loan_type)
        .bind(details.loan_amount)
        .execute(&self.pool)
        .await
        .context("apply update: upsert additional-details row")?;

        Ok(())
    }
}
