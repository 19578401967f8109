//! KYC lead management core: intake canonicalization, relational persistence,
//! partial-update reconciliation, address-to-agent assignment, and
//! field-level verification for loan KYC workflows.

pub mod assignment;
pub mod canonicalizer;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod lead_cache;
pub mod lead_storage;
pub mod models;
pub mod reconciler;
pub mod roster;
pub mod verification;
