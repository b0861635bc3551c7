//! License domain model.
//!
//! A license entitles one organization to use specified products and
//! features under quota limits. Quota and feature fields are a frozen
//! snapshot taken from the tier defaults at creation time; later
//! changes to the defaults never alter an existing license.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordinal subscription class. Stored on the license at creation and
/// never re-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseTier {
    Trial,
    Starter,
    Professional,
    Enterprise,
    Unlimited,
}

impl LicenseTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseTier::Trial => "TRIAL",
            LicenseTier::Starter => "STARTER",
            LicenseTier::Professional => "PROFESSIONAL",
            LicenseTier::Enterprise => "ENTERPRISE",
            LicenseTier::Unlimited => "UNLIMITED",
        }
    }
}

/// License lifecycle status. Terminal states (EXPIRED, CANCELLED) do
/// not auto-revert; only an operator action can change them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseStatus {
    Active,
    Suspended,
    Expired,
    Cancelled,
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseStatus::Active => "ACTIVE",
            LicenseStatus::Suspended => "SUSPENDED",
            LicenseStatus::Expired => "EXPIRED",
            LicenseStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Capability flags snapshotted onto a license.
///
/// Named flags cover the known feature surface; `extra` keeps room for
/// forward-compatible additions without a schema change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    #[serde(default)]
    pub demo_watermark: bool,
    #[serde(default)]
    pub email_support: bool,
    #[serde(default)]
    pub priority_support: bool,
    #[serde(default)]
    pub dedicated_support: bool,
    #[serde(default)]
    pub custom_branding: bool,
    #[serde(default)]
    pub white_label: bool,
    #[serde(default)]
    pub sla: bool,
    #[serde(default)]
    pub audit_logs: bool,
    #[serde(default)]
    pub custom_integrations: bool,
    #[serde(default)]
    pub custom_development: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A license record.
///
/// Invariant: `machine_ids.len() <= max_machines` after every mutation.
/// `machine_ids` holds one-way hashes; raw machine identifiers are
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: Uuid,
    /// Opaque key, format `XXXX-XXXX-XXXX-XXXX-XXXX`.
    pub key: String,
    pub organization_id: Uuid,
    pub tier: LicenseTier,
    pub status: LicenseStatus,
    pub max_users: u64,
    pub max_products: u64,
    pub max_api_calls: u64,
    pub max_storage_bytes: u64,
    /// Product identifiers this license grants access to.
    pub allowed_products: Vec<String>,
    pub features: FeatureSet,
    pub start_date: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_trial: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// SHA-256 hex digests of machine identifiers bound to this license.
    pub machine_ids: Vec<String>,
    pub max_machines: u64,
    pub last_validated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fully resolved fields for persisting a new license. Produced by the
/// license service after the entitlement snapshot is taken; the
/// repository stores it verbatim.
#[derive(Debug, Clone)]
pub struct NewLicense {
    pub key: String,
    pub organization_id: Uuid,
    pub tier: LicenseTier,
    pub max_users: u64,
    pub max_products: u64,
    pub max_api_calls: u64,
    pub max_storage_bytes: u64,
    pub allowed_products: Vec<String>,
    pub features: FeatureSet,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_trial: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub max_machines: u64,
}
