use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

// ============ Canonical Domain Models ============

/// Physical address category.
///
/// Anything the intake declares outside this set is coerced to `Residence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AddressKind {
    /// Home address.
    Residence,
    /// Workplace address.
    Office,
    /// Permanent (registered) address.
    Permanent,
}

impl AddressKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressKind::Residence => "Residence",
            AddressKind::Office => "Office",
            AddressKind::Permanent => "Permanent",
        }
    }

    /// Parses a declared address type, coercing unknown values to `Residence`.
    pub fn parse_or_residence(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "office" => AddressKind::Office,
            "permanent" => AddressKind::Permanent,
            _ => AddressKind::Residence,
        }
    }
}

/// Which applicant an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AddressOwner {
    Applicant,
    CoApplicant,
}

impl AddressOwner {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressOwner::Applicant => "applicant",
            AddressOwner::CoApplicant => "co_applicant",
        }
    }

    pub fn parse_or_applicant(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "co_applicant" | "coapplicant" | "co-applicant" => AddressOwner::CoApplicant,
            _ => AddressOwner::Applicant,
        }
    }
}

/// A physical address plus verification metadata.
///
/// Owned by exactly one lead. Immutable once verification starts except for
/// `assigned_agent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    /// Address category (Residence/Office/Permanent).
    pub kind: AddressKind,
    /// Street line.
    pub line1: String,
    /// City.
    pub city: String,
    /// District.
    pub district: String,
    /// State.
    pub state: String,
    /// Postal code.
    pub pincode: String,
    /// Owner of the address (applicant or co-applicant).
    pub owner: AddressOwner,
    /// Field agent assigned to verify this address, if any.
    pub assigned_agent_id: Option<String>,
}

impl Address {
    /// A blank address of the given kind, used when intake supplies none.
    pub fn blank(kind: AddressKind, owner: AddressOwner) -> Self {
        Self {
            kind,
            line1: String::new(),
            city: String::new(),
            district: String::new(),
            state: String::new(),
            pincode: String::new(),
            owner,
            assigned_agent_id: None,
        }
    }
}

/// Lead lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum LeadStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Rejected,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Pending => "Pending",
            LeadStatus::InProgress => "In Progress",
            LeadStatus::Completed => "Completed",
            LeadStatus::Rejected => "Rejected",
        }
    }

    pub fn parse_or_pending(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "in progress" | "in_progress" => LeadStatus::InProgress,
            "completed" => LeadStatus::Completed,
            "rejected" => LeadStatus::Rejected,
            _ => LeadStatus::Pending,
        }
    }
}

/// How the verification visit is conducted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum VisitType {
    Physical,
    Virtual,
}

impl VisitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitType::Physical => "Physical",
            VisitType::Virtual => "Virtual",
        }
    }

    /// Derives the visit type from free text; `virtual`/`online` anywhere in
    /// the value (case-insensitive) means a virtual visit.
    pub fn from_free_text(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("virtual") || lower.contains("online") {
            VisitType::Virtual
        } else {
            VisitType::Physical
        }
    }
}

/// Co-applicant sub-record.
///
/// Present on a lead iff `has_co_applicant` is true; every field defaults
/// independently to empty/zero at canonicalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CoApplicant {
    pub name: String,
    pub age: u32,
    pub phone: String,
    pub email: String,
    pub relation: String,
    pub occupation: String,
    pub income: f64,
}

/// Employment, property, vehicle, bank-product and loan attributes.
///
/// Every known field is a first-class struct member with a stable default so
/// consumers never branch on a missing key; `extra` is the only open-ended
/// extension point, reserved for attributes not yet promoted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdditionalDetails {
    /// Secondary addresses, in submission order.
    pub addresses: Vec<Address>,
    pub company: String,
    pub designation: String,
    pub occupation: String,
    pub monthly_income: f64,
    pub property_type: String,
    pub property_value: String,
    pub vehicle_brand_name: String,
    pub vehicle_model: String,
    pub bank_product: String,
    pub loan_type: String,
    pub loan_amount: f64,
    /// Attributes not yet promoted to first-class fields.
    pub extra: HashMap<String, String>,
}

/// The canonical lead record.
///
/// Invariant: `has_co_applicant == true` implies `co_applicant` is `Some`;
/// the inverse is `None`, never a zero-valued record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Lead {
    /// Globally unique identifier (caller- or system-generated).
    pub id: String,
    /// Applicant name.
    pub name: String,
    /// Applicant age; defaults to 25 when absent or non-numeric at intake.
    pub age: u32,
    /// Primary contact phone.
    pub phone: String,
    /// Contact email.
    pub email: String,
    /// Loan product the lead was submitted for (e.g. "Car Loan").
    pub lead_type: String,
    /// Stable bank identifier or submitted bank name.
    pub bank: String,
    /// Primary address (association index 0).
    pub address: Address,
    pub has_co_applicant: bool,
    pub co_applicant: Option<CoApplicant>,
    /// Present after canonicalization; `None` when the persisted lead has no
    /// details row. Callers must branch on this.
    pub additional_details: Option<AdditionalDetails>,
    pub status: LeadStatus,
    pub visit_type: VisitType,
    /// TVT coordinator assigned to the lead, if any.
    pub tvt_agent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A roster member. Roles of interest are exactly `"agent"` and `"tvt"`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub role: String,
    pub city: String,
}

// ============ Verification Models ============

/// One (original, verified, correctness, note) tuple for a single lead
/// attribute. Generated fresh from a lead snapshot; persisting a committed
/// list belongs to an external collaborator, not this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VerificationField {
    pub field_name: String,
    pub original_value: String,
    pub verified_value: String,
    pub is_verified: bool,
    /// Meaningful only when `is_verified` is true.
    pub is_correct: bool,
    pub notes: String,
}

/// Single-field edit applied via `verification::set_field`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FieldPatch {
    pub verified_value: Option<String>,
    pub is_verified: Option<bool>,
    pub is_correct: Option<bool>,
    pub notes: Option<String>,
}

/// Aggregate counters returned by a successful verification commit.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct VerificationSummary {
    pub total: usize,
    pub verified: usize,
    pub correct: usize,
    pub incorrect: usize,
}

// ============ Assignment Models ============

/// Derived, non-persistent view of the addresses in scope for field
/// verification.
///
/// `secondary` preserves association order (index 1..N of the persisted
/// lead), so a flattened view index is always the same index the storage
/// layer resolves. Ownership is a tag on each entry, never a sort key.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AddressAssignment {
    pub primary: Address,
    pub secondary: Vec<Address>,
    pub tvt_agent_id: Option<String>,
}

/// Completion counters derived from an assignment view.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AssignmentStatus {
    pub assigned_count: usize,
    pub total_addresses: usize,
    pub tvt_assigned: bool,
    pub fully_staffed: bool,
}

// ============ Partial Update (PATCH) Models ============

/// Sparse lead update. Absent fields are left untouched in storage.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub lead_type: Option<String>,
    /// Free-text bank name or stable identifier; names are translated via the
    /// bank directory before being written.
    pub bank: Option<String>,
    pub status: Option<LeadStatus>,
    pub visit_type: Option<VisitType>,
    pub address: Option<AddressPatch>,
    pub additional_details: Option<DetailsPatch>,
}

/// Sparse update of the lead's primary address.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AddressPatch {
    pub line1: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

/// Sparse update of the additional-details row; creates the row when the
/// lead has none yet.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DetailsPatch {
    pub company: Option<String>,
    pub designation: Option<String>,
    pub occupation: Option<String>,
    pub monthly_income: Option<f64>,
    pub property_type: Option<String>,
    pub property_value: Option<String>,
    pub vehicle_brand_name: Option<String>,
    pub vehicle_model: Option<String>,
    pub bank_product: Option<String>,
    pub loan_type: Option<String>,
    pub loan_amount: Option<f64>,
}

// ============ API Request/Response Models ============

/// Loosely-structured intake payload. Multi-step wizard state, single-page
/// form state and test fixtures all arrive through this shape.
pub type IntakePayload = serde_json::Value;

/// Query parameters for listing leads.
#[derive(Debug, Deserialize)]
pub struct LeadQueryParams {
    /// Filter by stable bank identifier.
    pub bank: Option<String>,
}

/// Response for lead creation.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateLeadResponse {
    pub success: bool,
    pub message: String,
    pub id: String,
}

/// Request body for assigning a field agent to one address.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignAgentRequest {
    /// Association index of the address (0 = primary).
    pub address_index: usize,
    pub agent_id: String,
}

/// Request body for assigning the TVT coordinator.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignTvtRequest {
    pub agent_id: String,
}

/// Assignment view plus derived completion counters.
#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentResponse {
    pub assignment: AddressAssignment,
    pub status: AssignmentStatus,
}

/// Request body for a single verification-field edit.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetFieldRequest {
    pub fields: Vec<VerificationField>,
    pub index: usize,
    pub patch: FieldPatch,
}

// ============ Database Row Models ============

/// Raw lead row. Co-applicant columns are nullable; they are all NULL when
/// `has_co_applicant` is false.
#[derive(Debug, Clone, FromRow)]
pub struct LeadRow {
    pub id: String,
    pub name: String,
    pub age: i32,
    pub phone: String,
    pub email: String,
    pub lead_type: String,
    pub bank: String,
    pub has_co_applicant: bool,
    pub co_applicant_name: Option<String>,
    pub co_applicant_age: Option<i32>,
    pub co_applicant_phone: Option<String>,
    pub co_applicant_email: Option<String>,
    pub co_applicant_relation: Option<String>,
    pub co_applicant_occupation: Option<String>,
    pub co_applicant_income: Option<f64>,
    pub status: String,
    pub visit_type: String,
    /// Back-filled reference to the primary address row.
    pub primary_address_id: Option<Uuid>,
    pub tvt_agent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw address row joined through the association table.
#[derive(Debug, Clone, FromRow)]
pub struct AddressRow {
    pub id: Uuid,
    pub kind: String,
    pub line1: String,
    pub city: String,
    pub district: String,
    pub state: String,
    pub pincode: String,
    pub owner: String,
    pub assigned_agent_id: Option<String>,
}

impl AddressRow {
    pub fn into_address(self) -> Address {
        Address {
            kind: AddressKind::parse_or_residence(&self.kind),
            line1: self.line1,
            city: self.city,
            district: self.district,
            state: self.state,
            pincode: self.pincode,
            owner: AddressOwner::parse_or_applicant(&self.owner),
            assigned_agent_id: self.assigned_agent_id,
        }
    }
}

/// Raw additional-details row (1:1 with a lead, created lazily).
#[derive(Debug, Clone, FromRow)]
pub struct DetailsRow {
    pub lead_id: String,
    pub company: String,
    pub designation: String,
    pub occupation: String,
    pub monthly_income: f64,
    pub property_type: String,
    pub property_value: String,
    pub vehicle_brand_name: String,
    pub vehicle_model: String,
    pub bank_product: String,
    pub loan_type: String,
    pub loan_amount: f64,
    pub extra: serde_json::Value,
}

impl DetailsRow {
    /// Rebuilds the canonical details bag; secondary addresses are supplied
    /// by the caller from the association table.
    pub fn into_details(self, addresses: Vec<Address>) -> AdditionalDetails {
        let extra: HashMap<String, String> = self
            .extra
            .as_object()
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        AdditionalDetails {
            addresses,
            company: self.company,
            designation: self.designation,
            occupation: self.occupation,
            monthly_income: self.monthly_income,
            property_type: self.property_type,
            property_value: self.property_value,
            vehicle_brand_name: self.vehicle_brand_name,
            vehicle_model: self.vehicle_model,
            bank_product: self.bank_product,
            loan_type: self.loan_type,
            loan_amount: self.loan_amount,
            extra,
        }
    }
}
