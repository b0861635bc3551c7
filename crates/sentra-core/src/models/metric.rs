//! Agent telemetry metrics, append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One metric batch submitted by an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMetric {
    pub id: Uuid,
    pub agent_id: Uuid,
    /// Discriminator for the payload shape (`system`, `security`, …).
    pub metric_type: String,
    pub metric_data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAgentMetric {
    pub agent_id: Uuid,
    pub metric_type: String,
    pub metric_data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}
