//! Remote command queue.
//!
//! Operators enqueue commands; agents poll for PENDING entries and
//! drive the status forward. Execution itself is outside this service,
//! and there is no cancellation or priority model.

use sentra_core::error::SentraResult;
use sentra_core::models::command::{AgentCommand, CommandStatus, CreateAgentCommand};
use sentra_core::repository::{AgentRepository, CommandRepository};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

pub struct CommandService<A, C>
where
    A: AgentRepository,
    C: CommandRepository,
{
    agents: A,
    commands: C,
}

impl<A, C> CommandService<A, C>
where
    A: AgentRepository,
    C: CommandRepository,
{
    pub fn new(agents: A, commands: C) -> Self {
        Self { agents, commands }
    }

    /// Queue a command for an agent; it starts PENDING.
    pub async fn enqueue(
        &self,
        organization_id: Uuid,
        agent_id: Uuid,
        command_type: String,
        command_data: Value,
        created_by: Uuid,
    ) -> SentraResult<AgentCommand> {
        let agent = self.agents.get_by_id(organization_id, agent_id).await?;

        let command = self
            .commands
            .create(CreateAgentCommand {
                agent_id: agent.id,
                command_type,
                command_data,
                created_by,
            })
            .await?;

        info!(
            agent_id = %agent.id,
            command_id = %command.id,
            command_type = %command.command_type,
            "command queued"
        );

        Ok(command)
    }

    /// Commands for an agent, newest first, optionally filtered by
    /// status.
    pub async fn list(
        &self,
        organization_id: Uuid,
        agent_id: Uuid,
        status: Option<CommandStatus>,
        limit: u64,
    ) -> SentraResult<Vec<AgentCommand>> {
        let agent = self.agents.get_by_id(organization_id, agent_id).await?;
        self.commands.list(agent.id, status, limit).await
    }
}
