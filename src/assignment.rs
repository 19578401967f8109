//! Address-to-agent assignment resolution.
//!
//! Pure module: the roster is always injected as a slice, never read from
//! ambient state, so the resolver is testable against a fixed fixture.
//! Persisting an assignment is the storage layer's job; this module only
//! derives the in-scope address set and validates roster roles.

use crate::errors::AppError;
use crate::models::{AddressAssignment, AddressOwner, Agent, AssignmentStatus, Lead};

/// Roster role for field agents.
pub const ROLE_FIELD_AGENT: &str = "agent";
/// Roster role for the technical-verification-team coordinator.
pub const ROLE_TVT: &str = "tvt";

/// Derives the full set of addresses requiring field coverage.
///
/// The secondary list keeps association order (index 1..N as persisted),
/// never a by-owner grouping: the flattened view index must name the same
/// address row the storage layer resolves through the association table.
/// Ownership stays a tag on each entry.
pub fn collect_addresses(lead: &Lead) -> AddressAssignment {
    let secondary = lead
        .additional_details
        .as_ref()
        .map(|d| d.addresses.clone())
        .unwrap_or_default();

    AddressAssignment {
        primary: lead.address.clone(),
        secondary,
        tvt_agent_id: lead.tvt_agent_id.clone(),
    }
}

impl AddressAssignment {
    /// Flattened in-scope addresses in association order: primary first,
    /// then the secondary list as persisted.
    pub fn addresses(&self) -> Vec<&crate::models::Address> {
        std::iter::once(&self.primary)
            .chain(self.secondary.iter())
            .collect()
    }

    /// Addresses owned by the given applicant, for display grouping.
    pub fn owned_by(&self, owner: AddressOwner) -> Vec<&crate::models::Address> {
        self.addresses()
            .into_iter()
            .filter(|a| a.owner == owner)
            .collect()
    }

    fn address_mut(&mut self, index: usize) -> Option<&mut crate::models::Address> {
        match index {
            0 => Some(&mut self.primary),
            i => self.secondary.get_mut(i - 1),
        }
    }
}

/// Assigns a field agent to the address at the given flattened index.
/// Reassignment overwrites the prior agent; there is no history.
pub fn assign_agent(
    assignment: &mut AddressAssignment,
    index: usize,
    agent: &Agent,
) -> Result<(), AppError> {
    if agent.role != ROLE_FIELD_AGENT {
        return Err(AppError::BadRequest(format!(
            "Agent {} has role '{}', expected '{}'",
            agent.id, agent.role, ROLE_FIELD_AGENT
        )));
    }

    let total = assignment.addresses().len();
    let address = assignment.address_mut(index).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Address index {} out of range (lead has {} addresses)",
            index, total
        ))
    })?;

    address.assigned_agent_id = Some(agent.id.clone());
    Ok(())
}

/// Assigns the overall TVT coordinator. Overwrite semantics.
pub fn assign_tvt(assignment: &mut AddressAssignment, agent: &Agent) -> Result<(), AppError> {
    if agent.role != ROLE_TVT {
        return Err(AppError::BadRequest(format!(
            "Agent {} has role '{}', expected '{}'",
            agent.id, agent.role, ROLE_TVT
        )));
    }

    assignment.tvt_agent_id = Some(agent.id.clone());
    Ok(())
}

/// Completion counters. Fully staffed means every address has an agent and a
/// TVT coordinator is set.
pub fn status(assignment: &AddressAssignment) -> AssignmentStatus {
    let addresses = assignment.addresses();
    let assigned_count = addresses
        .iter()
        .filter(|a| a.assigned_agent_id.is_some())
        .count();
    let total_addresses = addresses.len();
    let tvt_assigned = assignment.tvt_agent_id.is_some();

    AssignmentStatus {
        assigned_count,
        total_addresses,
        tvt_assigned,
        fully_staffed: assigned_count == total_addresses && tvt_assigned,
    }
}
