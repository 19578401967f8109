//! Agent roster provider.
//!
//! The assignment resolver only ever sees an injected `&[Agent]`; these
//! functions are the one place that reads the roster table.

use crate::errors::{AppError, ResultExt};
use crate::models::Agent;
use sqlx::PgPool;

/// Loads the full agent roster.
pub async fn load_roster(pool: &PgPool) -> Result<Vec<Agent>, AppError> {
    sqlx::query_as::<_, Agent>("SELECT id, name, role, city FROM kyc.agents ORDER BY name ASC")
        .fetch_all(pool)
        .await
        .context("load roster: fetch agents")
}

/// Looks up one roster member by id.
pub async fn find_agent(pool: &PgPool, agent_id: &str) -> Result<Agent, AppError> {
    sqlx::query_as::<_, Agent>("SELECT id, name, role, city FROM kyc.agents WHERE id = $1")
        .bind(agent_id)
        .fetch_optional(pool)
        .await
        .context("find agent: fetch agent row")?
        .ok_or_else(|| AppError::NotFound(format!("Agent with id {} not found", agent_id)))
}
