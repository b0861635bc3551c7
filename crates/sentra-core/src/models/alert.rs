//! Agent alert domain model.
//!
//! Alerts are created only by the alert engine when an ingested metric
//! breaches a threshold. They transition once from unresolved to
//! resolved and are never re-opened or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Warning,
    Error,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Error => "ERROR",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAlert {
    pub id: Uuid,
    pub agent_id: Uuid,
    /// Breached dimension (`cpu`, `memory`, `disk`, `security`, `updates`).
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub message: String,
    /// The metric values that triggered the alert.
    pub details: serde_json::Value,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAgentAlert {
    pub agent_id: Uuid,
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub details: serde_json::Value,
}
