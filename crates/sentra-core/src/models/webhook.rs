//! Webhook subscriber registry.
//!
//! Only the registration contract lives here; delivery mechanics are
//! out of scope. `get_by_event` on the repository is the interface
//! boundary a delivery worker would consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub url: String,
    /// Event types this webhook is subscribed to (e.g. `license.expired`).
    pub events: Vec<String>,
    /// SHA-256 digest of the shared signing secret; the raw `whsec_…`
    /// value is returned once at registration.
    #[serde(skip_serializing)]
    pub secret_hash: String,
    pub is_active: bool,
    pub last_triggered: Option<DateTime<Utc>>,
    pub success_count: u64,
    pub failure_count: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWebhook {
    pub organization_id: Uuid,
    pub url: String,
    pub events: Vec<String>,
    pub secret_hash: String,
}
