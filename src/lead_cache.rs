//! Integrity-checked cache entries for hydrated leads.
//!
//! Cached leads are stored as serialized JSON alongside a SHA-256 checksum;
//! the checksum is validated on retrieval and a mismatch falls back to a
//! fresh hydrate instead of serving a corrupted record.

use crate::models::Lead;
use hex;
use sha2::{Digest, Sha256};

/// A hydrated lead wrapped for cache storage with an integrity checksum.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CachedLead {
    /// Serialized canonical lead (JSON).
    payload: String,
    /// SHA-256 checksum of the payload (hex encoded).
    checksum: String,
}

impl CachedLead {
    /// Wraps a lead for caching. Returns `None` if serialization fails,
    /// in which case the caller simply skips the cache.
    pub fn new(lead: &Lead) -> Option<Self> {
        let payload = serde_json::to_string(lead).ok()?;
        let checksum = compute_checksum(&payload);
        Some(Self { payload, checksum })
    }

    /// Validates the checksum and deserializes the lead.
    ///
    /// Returns `None` for a tampered or unparseable entry; the caller should
    /// treat that as a cache miss.
    pub fn into_lead(self) -> Option<Lead> {
        if compute_checksum(&self.payload) != self.checksum {
            tracing::warn!(
                "Lead cache validation failed: checksum mismatch (payload length {})",
                self.payload.len()
            );
            return None;
        }
        serde_json::from_str(&self.payload).ok()
    }
}

fn compute_checksum(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}
