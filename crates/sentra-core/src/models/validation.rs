//! License validation audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One validation attempt, recorded unconditionally: success or
/// failure, known key or not. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseValidation {
    pub id: Uuid,
    /// `None` means the submitted key matched no license.
    pub license_id: Option<Uuid>,
    pub is_valid: bool,
    pub reason: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Machine identifier as submitted by the caller. Kept on the audit
    /// row only; the license itself stores hashes.
    pub machine_id: Option<String>,
    pub product_id: Option<String>,
    pub validated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateLicenseValidation {
    pub license_id: Option<Uuid>,
    pub is_valid: bool,
    pub reason: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub machine_id: Option<String>,
    pub product_id: Option<String>,
}
