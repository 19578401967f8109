//! Relational persistence for canonical leads.
//!
//! One lead fans out to: a lead row, a lazily-created additional-details row,
//! N address rows, and one association row per address in `kyc.lead_addresses`
//! (position 0 is always the primary address; the lead row also carries a
//! back-filled `primary_address_id` for fast lookup).

use crate::errors::{AppError, ResultExt};
use crate::models::{
    AddressRow, AdditionalDetails, Address, CoApplicant, DetailsRow, Lead, LeadRow, LeadStatus,
    VisitType,
};
use sqlx::PgPool;
use uuid::Uuid;

/// Storage service for the lead/address/details fan-out.
pub struct LeadStorage {
    pool: PgPool,
}

impl LeadStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persists a canonical lead.
    ///
    /// Insert order matters: lead row, details row, then each address plus
    /// its association row, then the primary-address back-fill. The whole
    /// sequence runs in one transaction so a mid-sequence failure cannot
    /// leave orphaned address rows.
    pub async fn persist(&self, lead: &Lead) -> Result<String, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("persist lead: begin transaction")?;

        let co = lead.co_applicant.as_ref();

        sqlx::query(
            r#"
            INSERT INTO kyc.leads (
                id, name, age, phone, email, lead_type, bank, has_co_applicant,
                co_applicant_name, co_applicant_age, co_applicant_phone,
                co_applicant_email, co_applicant_relation, co_applicant_occupation,
                co_applicant_income, status, visit_type, tvt_agent_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(&lead.id)
        .bind(&lead.name)
        .bind(lead.age as i32)
        .bind(&lead.phone)
        .bind(&lead.email)
        .bind(&lead.lead_type)
        .bind(&lead.bank)
        .bind(lead.has_co_applicant)
        .bind(co.map(|c| c.name.clone()))
        .bind(co.map(|c| c.age as i32))
        .bind(co.map(|c| c.phone.clone()))
        .bind(co.map(|c| c.email.clone()))
        .bind(co.map(|c| c.relation.clone()))
        .bind(co.map(|c| c.occupation.clone()))
        .bind(co.map(|c| c.income))
        .bind(lead.status.as_str())
        .bind(lead.visit_type.as_str())
        .bind(&lead.tvt_agent_id)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .execute(&mut *tx)
        .await
        .context("persist lead: insert lead row")?;

        if let Some(details) = &lead.additional_details {
            let extra = serde_json::to_value(&details.extra)
                .map_err(|e| AppError::InternalError(format!("serialize extra map: {}", e)))?;

            sqlx::query(
                r#"
                INSERT INTO kyc.additional_details (
                    lead_id, company, designation, occupation, monthly_income,
                    property_type, property_value, vehicle_brand_name,
                    vehicle_model, bank_product, loan_type, loan_amount, extra,
                    created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                        now(), now())
                "#,
            )
            .bind(&lead.id)
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
            .bind(extra)
            .execute(&mut *tx)
            .await
            .context("persist lead: insert additional-details row")?;
        }

        let secondary: &[Address] = lead
            .additional_details
            .as_ref()
            .map(|d| d.addresses.as_slice())
            .unwrap_or(&[]);

        let mut primary_address_id: Option<Uuid> = None;

        for (position, address) in std::iter::once(&lead.address)
            .chain(secondary.iter())
            .enumerate()
        {
            let address_id = Uuid::new_v4();

            sqlx::query(
                r#"
                INSERT INTO kyc.addresses (
                    id, kind, line1, city, district, state, pincode, owner,
                    assigned_agent_id, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
                "#,
            )
            .bind(address_id)
            .bind(address.kind.as_str())
            .bind(&address.line1)
            .bind(&address.city)
            .bind(&address.district)
            .bind(&address.state)
            .bind(&address.pincode)
            .bind(address.owner.as_str())
            .bind(&address.assigned_agent_id)
            .execute(&mut *tx)
            .await
            .context("persist lead: insert address row")?;

            sqlx::query(
                "INSERT INTO kyc.lead_addresses (lead_id, address_id, position) VALUES ($1, $2, $3)",
            )
            .bind(&lead.id)
            .bind(address_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .context("persist lead: insert address association")?;

            if position == 0 {
                primary_address_id = Some(address_id);
            }
        }

        sqlx::query("UPDATE kyc.leads SET primary_address_id = $2 WHERE id = $1")
            .bind(&lead.id)
            .bind(primary_address_id)
            .execute(&mut *tx)
            .await
            .context("persist lead: back-fill primary address reference")?;

        tx.commit().await.context("persist lead: commit")?;

        tracing::info!(
            "Persisted lead {} ({} address(es), details: {})",
            lead.id,
            1 + secondary.len(),
            lead.additional_details.is_some()
        );

        Ok(lead.id.clone())
    }

    /// Reconstructs one canonical lead from its rows.
    pub async fn hydrate(&self, lead_id: &str) -> Result<Lead, AppError> {
        let row = sqlx::query_as::<_, LeadRow>("SELECT * FROM kyc.leads WHERE id = $1")
            .bind(lead_id)
            .fetch_optional(&self.pool)
            .await
            .context("hydrate lead: fetch lead row")?
            .ok_or_else(|| AppError::NotFound(format!("Lead with id {} not found", lead_id)))?;

        self.assemble(row).await
    }

    /// Reconstructs every lead, optionally filtered by bank identifier.
    ///
    /// The filter is a pass-through predicate on the lead row; address
    /// reconstruction is shared with the unfiltered path.
    pub async fn hydrate_all(&self, bank: Option<&str>) -> Result<Vec<Lead>, AppError> {
        let rows = match bank {
            Some(bank_id) => {
                sqlx::query_as::<_, LeadRow>(
                    "SELECT * FROM kyc.leads WHERE bank = $1 ORDER BY created_at DESC",
                )
                .bind(bank_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, LeadRow>("SELECT * FROM kyc.leads ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .context("hydrate leads: fetch lead rows")?;

        let mut leads = Vec::with_capacity(rows.len());
        for row in rows {
            leads.push(self.assemble(row).await?);
        }

        Ok(leads)
    }

    /// Shared reconstruction: association index 0 is the primary address,
    /// indices 1..N become the details bag's secondary list in order. A lead
    /// whose details row is absent yields `additional_details = None`.
    async fn assemble(&self, row: LeadRow) -> Result<Lead, AppError> {
        let address_rows = sqlx::query_as::<_, AddressRow>(
            r#"
            SELECT a.id, a.kind, a.line1, a.city, a.district, a.state,
                   a.pincode, a.owner, a.assigned_agent_id
            FROM kyc.addresses a
            JOIN kyc.lead_addresses la ON la.address_id = a.id
            WHERE la.lead_id = $1
            ORDER BY la.position ASC
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await
        .context("hydrate lead: fetch address associations")?;

        let details_row = sqlx::query_as::<_, DetailsRow>(
            "SELECT * FROM kyc.additional_details WHERE lead_id = $1",
        )
        .bind(&row.id)
        .fetch_optional(&self.pool)
        .await
        .context("hydrate lead: fetch additional-details row")?;

        Ok(assemble_lead(row, details_row, address_rows))
    }

    /// Assigns a field agent to the address at the given association index.
    /// Reassignment overwrites; there is no history.
    pub async fn assign_agent(
        &self,
        lead_id: &str,
        address_index: usize,
        agent_id: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE kyc.addresses
            SET assigned_agent_id = $3
            WHERE id = (
                SELECT address_id FROM kyc.lead_addresses
                WHERE lead_id = $1 AND position = $2
            )
            "#,
        )
        .bind(lead_id)
        .bind(address_index as i32)
        .bind(agent_id)
        .execute(&self.pool)
        .await
        .context("assign agent: update address row")?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "No address at index {} for lead {}",
                address_index, lead_id
            )));
        }

        Ok(())
    }

    /// Assigns the TVT coordinator for the lead. Overwrite semantics.
    pub async fn assign_tvt(&self, lead_id: &str, agent_id: &str) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE kyc.leads SET tvt_agent_id = $2, updated_at = now() WHERE id = $1")
                .bind(lead_id)
                .bind(agent_id)
                .execute(&self.pool)
                .await
                .context("assign tvt: update lead row")?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Lead with id {} not found",
                lead_id
            )));
        }

        Ok(())
    }

    /// Deletes a lead and cascades to its details, addresses and
    /// associations.
    pub async fn delete(&self, lead_id: &str) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("delete lead: begin transaction")?;

        sqlx::query(
            r#"
            DELETE FROM kyc.addresses
            WHERE id IN (SELECT address_id FROM kyc.lead_addresses WHERE lead_id = $1)
            "#,
        )
        .bind(lead_id)
        .execute(&mut *tx)
        .await
        .context("delete lead: delete address rows")?;

        sqlx::query("DELETE FROM kyc.lead_addresses WHERE lead_id = $1")
            .bind(lead_id)
            .execute(&mut *tx)
            .await
            .context("delete lead: delete address associations")?;

        sqlx::query("DELETE FROM kyc.additional_details WHERE lead_id = $1")
            .bind(lead_id)
            .execute(&mut *tx)
            .await
            .context("delete lead: delete additional-details row")?;

        let result = sqlx::query("DELETE FROM kyc.leads WHERE id = $1")
            .bind(lead_id)
            .execute(&mut *tx)
            .await
            .context("delete lead: delete lead row")?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Lead with id {} not found",
                lead_id
            )));
        }

        tx.commit().await.context("delete lead: commit")?;

        tracing::info!("Deleted lead {} with cascade", lead_id);
        Ok(())
    }
}

/// Pure row-to-canonical assembly, shared by all read paths.
pub fn assemble_lead(
    row: LeadRow,
    details_row: Option<DetailsRow>,
    address_rows: Vec<AddressRow>,
) -> Lead {
    let mut addresses: Vec<Address> = address_rows
        .into_iter()
        .map(AddressRow::into_address)
        .collect();

    let primary = if addresses.is_empty() {
        Address::blank(
            crate::models::AddressKind::Residence,
            crate::models::AddressOwner::Applicant,
        )
    } else {
        addresses.remove(0)
    };

    let co_applicant = if row.has_co_applicant {
        Some(CoApplicant {
            name: row.co_applicant_name.unwrap_or_default(),
            age: row.co_applicant_age.unwrap_or(0).max(0) as u32,
            phone: row.co_applicant_phone.unwrap_or_default(),
            email: row.co_applicant_email.unwrap_or_default(),
            relation: row.co_applicant_relation.unwrap_or_default(),
            occupation: row.co_applicant_occupation.unwrap_or_default(),
            income: row.co_applicant_income.unwrap_or_default(),
        })
    } else {
        None
    };

    let additional_details: Option<AdditionalDetails> =
        details_row.map(|d| d.into_details(addresses));

    Lead {
        id: row.id,
        name: row.name,
        age: row.age.max(0) as u32,
        phone: row.phone,
        email: row.email,
        lead_type: row.lead_type,
        bank: row.bank,
        address: primary,
        has_co_applicant: row.has_co_applicant,
        co_applicant,
        additional_details,
        status: LeadStatus::parse_or_pending(&row.status),
        visit_type: VisitType::from_free_text(&row.visit_type),
        tvt_agent_id: row.tvt_agent_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
