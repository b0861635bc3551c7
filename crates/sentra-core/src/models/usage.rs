//! Usage metering: append-only billable/countable events.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One metered event. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub license_id: Option<Uuid>,
    pub product_id: String,
    pub event_type: String,
    pub quantity: u64,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUsageRecord {
    pub organization_id: Uuid,
    pub license_id: Option<Uuid>,
    pub product_id: String,
    pub event_type: String,
    pub quantity: u64,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Aggregated usage for one `(product, event type)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummaryRow {
    pub product_id: String,
    pub event_type: String,
    pub total_quantity: u64,
}
