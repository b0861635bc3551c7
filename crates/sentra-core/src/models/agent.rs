//! Remote monitoring agent domain model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    Active,
    Inactive,
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "ACTIVE",
            AgentStatus::Inactive => "INACTIVE",
            AgentStatus::Error => "ERROR",
        }
    }
}

/// A remote monitoring agent, unique per `(organization, hostname)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub hostname: String,
    pub ip_address: Option<String>,
    pub os_type: String,
    pub os_version: Option<String>,
    pub agent_version: String,
    /// Service credential (`agent_…`) the agent authenticates with.
    #[serde(skip_serializing)]
    pub api_key: String,
    pub status: AgentStatus,
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
    pub license_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resolved fields for persisting a new agent.
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub organization_id: Uuid,
    pub hostname: String,
    pub ip_address: Option<String>,
    pub os_type: String,
    pub os_version: Option<String>,
    pub agent_version: String,
    pub api_key: String,
    pub config: BTreeMap<String, serde_json::Value>,
    pub license_id: Option<Uuid>,
}

/// Fields that can be updated on an existing agent.
#[derive(Debug, Clone, Default)]
pub struct UpdateAgent {
    pub ip_address: Option<String>,
    pub os_type: Option<String>,
    pub os_version: Option<String>,
    pub agent_version: Option<String>,
    pub status: Option<AgentStatus>,
    pub config: Option<BTreeMap<String, serde_json::Value>>,
}
