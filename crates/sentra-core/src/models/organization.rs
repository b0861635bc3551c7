//! Organization domain model.
//!
//! Organizations are the tenancy root: every license, API key, agent,
//! and webhook belongs to exactly one organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer organization.
///
/// Created at registration, rarely mutated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// Unique DNS domain (e.g. `acme.example`).
    pub domain: String,
    /// Primary contact address for billing and alerts.
    pub contact_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to register a new organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganization {
    pub name: String,
    pub domain: String,
    pub contact_email: String,
}
