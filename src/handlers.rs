use crate::assignment;
use crate::canonicalizer::{canonicalize, validate_in_phone};
use crate::config::Config;
use crate::errors::AppError;
use crate::lead_cache::CachedLead;
use crate::lead_storage::LeadStorage;
use crate::models::*;
use crate::reconciler::LeadReconciler;
use crate::roster;
use crate::verification;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Hydrated-lead cache, keyed by lead id. Entries are integrity-checked
    /// on retrieval; invalidated on every write to the lead.
    pub lead_cache: Cache<String, CachedLead>,
}

impl AppState {
    /// Hydrates a lead through the cache, falling back to storage on a miss
    /// or a failed integrity check.
    async fn hydrate_cached(&self, lead_id: &str) -> Result<Lead, AppError> {
        if let Some(entry) = self.lead_cache.get(lead_id).await {
            if let Some(lead) = entry.into_lead() {
                return Ok(lead);
            }
            self.lead_cache.invalidate(lead_id).await;
        }

        let lead = LeadStorage::new(self.db.clone()).hydrate(lead_id).await?;
        if let Some(entry) = CachedLead::new(&lead) {
            self.lead_cache.insert(lead_id.to_string(), entry).await;
        }
        Ok(lead)
    }
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "kyc-lead-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /api/v1/leads
///
/// Canonicalizes whatever payload the intake UI assembled and persists the
/// resulting lead. Canonicalization itself never rejects; the only boundary
/// guard is the co-applicant flag/record mismatch.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<IntakePayload>,
) -> Result<(StatusCode, Json<CreateLeadResponse>), AppError> {
    let lead = canonicalize(&payload);

    if lead.has_co_applicant
        && payload.get("coApplicant").is_none()
        && payload.get("co_applicant").is_none()
    {
        return Err(AppError::BadRequest(
            "hasCoApplicant is set but no co-applicant record was supplied".to_string(),
        ));
    }

    if !lead.phone.is_empty() {
        let (valid, detail) = validate_in_phone(&lead.phone);
        if !valid {
            tracing::warn!(
                "Lead {} submitted with implausible phone '{}': {}",
                lead.id,
                lead.phone,
                detail
            );
        }
    }

    let storage = LeadStorage::new(state.db.clone());
    let id = storage.persist(&lead).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateLeadResponse {
            success: true,
            message: "Lead created".to_string(),
            id,
        }),
    ))
}

/// GET /api/v1/leads
///
/// Lists leads, optionally filtered by stable bank identifier. The filter is
/// a pass-through predicate on the lead row.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeadQueryParams>,
) -> Result<Json<Vec<Lead>>, AppError> {
    let storage = LeadStorage::new(state.db.clone());
    let leads = storage.hydrate_all(params.bank.as_deref()).await?;

    tracing::info!(
        "Listed {} lead(s) (bank filter: {:?})",
        leads.len(),
        params.bank
    );
    Ok(Json(leads))
}

/// GET /api/v1/leads/:id
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<String>,
) -> Result<Json<Lead>, AppError> {
    let lead = state.hydrate_cached(&lead_id).await?;
    Ok(Json(lead))
}

/// PATCH /api/v1/leads/:id
///
/// Sparse partial update; only supplied fields are written.
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<String>,
    Json(patch): Json<LeadPatch>,
) -> Result<Json<serde_json::Value>, AppError> {
    let reconciler = LeadReconciler::new(state.db.clone());
    reconciler.apply_update(&lead_id, &patch).await?;

    state.lead_cache.invalidate(&lead_id).await;

    Ok(Json(json!({ "success": true, "id": lead_id })))
}

/// DELETE /api/v1/leads/:id
///
/// Whole-lead deletion cascades to details, addresses and associations.
pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let storage = LeadStorage::new(state.db.clone());
    storage.delete(&lead_id).await?;

    state.lead_cache.invalidate(&lead_id).await;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/agents
pub async fn list_agents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Agent>>, AppError> {
    let agents = roster::load_roster(&state.db).await?;
    Ok(Json(agents))
}

/// GET /api/v1/leads/:id/assignment
///
/// Derived view of the addresses in scope for field verification plus the
/// completion counters.
pub async fn get_assignment(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<String>,
) -> Result<Json<AssignmentResponse>, AppError> {
    let lead = state.hydrate_cached(&lead_id).await?;
    let view = assignment::collect_addresses(&lead);
    let status = assignment::status(&view);

    Ok(Json(AssignmentResponse {
        assignment: view,
        status,
    }))
}

/// POST /api/v1/leads/:id/assignment/agent
///
/// Assigns a field agent to one address. Role is validated against the
/// roster before anything is written; reassignment overwrites.
pub async fn assign_agent(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<String>,
    Json(req): Json<AssignAgentRequest>,
) -> Result<Json<AssignmentResponse>, AppError> {
    let lead = state.hydrate_cached(&lead_id).await?;
    let agent = roster::find_agent(&state.db, &req.agent_id).await?;

    let mut view = assignment::collect_addresses(&lead);
    assignment::assign_agent(&mut view, req.address_index, &agent)?;

    let storage = LeadStorage::new(state.db.clone());
    storage
        .assign_agent(&lead_id, req.address_index, &agent.id)
        .await?;

    state.lead_cache.invalidate(&lead_id).await;

    tracing::info!(
        "Assigned agent {} to address {} of lead {}",
        agent.id,
        req.address_index,
        lead_id
    );

    let status = assignment::status(&view);
    Ok(Json(AssignmentResponse {
        assignment: view,
        status,
    }))
}

/// POST /api/v1/leads/:id/assignment/tvt
///
/// Assigns the TVT coordinator for the lead.
pub async fn assign_tvt(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<String>,
    Json(req): Json<AssignTvtRequest>,
) -> Result<Json<AssignmentResponse>, AppError> {
    let lead = state.hydrate_cached(&lead_id).await?;
    let agent = roster::find_agent(&state.db, &req.agent_id).await?;

    let mut view = assignment::collect_addresses(&lead);
    assignment::assign_tvt(&mut view, &agent)?;

    let storage = LeadStorage::new(state.db.clone());
    storage.assign_tvt(&lead_id, &agent.id).await?;

    state.lead_cache.invalidate(&lead_id).await;

    tracing::info!("Assigned TVT agent {} to lead {}", agent.id, lead_id);

    let status = assignment::status(&view);
    Ok(Json(AssignmentResponse {
        assignment: view,
        status,
    }))
}

/// GET /api/v1/leads/:id/verification
///
/// Expands the lead snapshot into the full ordered verification field list.
pub async fn expand_verification(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<String>,
) -> Result<Json<Vec<VerificationField>>, AppError> {
    let lead = state.hydrate_cached(&lead_id).await?;
    Ok(Json(verification::expand(&lead)))
}

/// POST /api/v1/verification/set-field
///
/// Applies one field edit and returns the updated list. Pure computation;
/// nothing is persisted here.
pub async fn set_verification_field(
    Json(req): Json<SetFieldRequest>,
) -> Result<Json<Vec<VerificationField>>, AppError> {
    let updated = verification::set_field(&req.fields, req.index, &req.patch)?;
    Ok(Json(updated))
}

/// POST /api/v1/leads/:id/verification/commit
///
/// Computes the aggregate outcome of a verification pass. Persisting the
/// committed field list is an external collaborator's job.
pub async fn commit_verification(
    Path(lead_id): Path<String>,
    Json(fields): Json<Vec<VerificationField>>,
) -> Result<Json<VerificationSummary>, AppError> {
    let summary = verification::commit(&fields)?;

    tracing::info!(
        "Verification commit for lead {}: {}/{} verified, {} correct, {} incorrect",
        lead_id,
        summary.verified,
        summary.total,
        summary.correct,
        summary.incorrect
    );

    Ok(Json(summary))
}
