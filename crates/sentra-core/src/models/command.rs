//! Remote command queue domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Command lifecycle. Status moves forward only; execution and
/// acknowledgement by the agent are outside this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Pending,
    Acked,
    Running,
    Completed,
    Failed,
}

impl CommandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Pending => "PENDING",
            CommandStatus::Acked => "ACKED",
            CommandStatus::Running => "RUNNING",
            CommandStatus::Completed => "COMPLETED",
            CommandStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCommand {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub command_type: String,
    pub command_data: serde_json::Value,
    pub status: CommandStatus,
    /// Operator who queued the command.
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAgentCommand {
    pub agent_id: Uuid,
    pub command_type: String,
    pub command_data: serde_json::Value,
    pub created_by: Uuid,
}
