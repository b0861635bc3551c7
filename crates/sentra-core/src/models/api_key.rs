//! API key domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A service credential scoped to an organization.
///
/// Only the SHA-256 digest of the raw `sk_…` credential is stored; the
/// raw value is returned exactly once, at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub scopes: Vec<String>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
    /// Monotonically increasing call counter.
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Resolved fields for persisting a new API key (hash precomputed by
/// the caller; the raw credential never reaches the repository).
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub organization_id: Uuid,
    pub name: String,
    pub key_hash: String,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}
