//! Agent registration and lifecycle.

use std::collections::BTreeMap;

use chrono::Utc;
use sentra_core::error::{SentraError, SentraResult};
use sentra_core::models::agent::{Agent, AgentStatus, NewAgent, UpdateAgent};
use sentra_core::repository::{AgentRepository, PaginatedResult, Pagination};
use serde::{Deserialize, Serialize};
use sentra_license::keygen;
use tracing::info;
use uuid::Uuid;

/// Registration payload sent by an agent on startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAgentInput {
    pub hostname: String,
    pub ip_address: Option<String>,
    pub os_type: String,
    pub os_version: Option<String>,
    pub agent_version: String,
    pub config: Option<BTreeMap<String, serde_json::Value>>,
}

/// Whether registration created a fresh identity or refreshed an
/// existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterOutcome {
    Created,
    Updated,
}

/// A completed registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub agent: Agent,
    pub outcome: RegisterOutcome,
}

/// Agent registry service.
pub struct AgentService<A: AgentRepository> {
    agents: A,
}

impl<A: AgentRepository> AgentService<A> {
    pub fn new(agents: A) -> Self {
        Self { agents }
    }

    /// Upsert an agent by `(organization, hostname)`.
    ///
    /// A re-registration from a known hostname refreshes the mutable
    /// fields and keeps the existing credential; a new hostname gets a
    /// fresh `agent_…` credential.
    pub async fn register(
        &self,
        organization_id: Uuid,
        input: RegisterAgentInput,
    ) -> SentraResult<Registration> {
        let now = Utc::now();

        match self
            .agents
            .get_by_hostname(organization_id, &input.hostname)
            .await
        {
            Ok(existing) => {
                let agent = self
                    .agents
                    .update(
                        organization_id,
                        existing.id,
                        UpdateAgent {
                            ip_address: input.ip_address,
                            os_type: Some(input.os_type),
                            os_version: input.os_version,
                            agent_version: Some(input.agent_version),
                            status: Some(AgentStatus::Active),
                            config: input.config,
                        },
                    )
                    .await?;
                self.agents.touch_seen(agent.id, now).await?;

                info!(agent_id = %agent.id, hostname = %agent.hostname, "agent re-registered");
                Ok(Registration {
                    agent,
                    outcome: RegisterOutcome::Updated,
                })
            }
            Err(SentraError::NotFound { .. }) => {
                let agent = self
                    .agents
                    .create(NewAgent {
                        organization_id,
                        hostname: input.hostname,
                        ip_address: input.ip_address,
                        os_type: input.os_type,
                        os_version: input.os_version,
                        agent_version: input.agent_version,
                        api_key: keygen::generate_agent_key(),
                        config: input.config.unwrap_or_default(),
                        license_id: None,
                    })
                    .await?;
                self.agents.touch_seen(agent.id, now).await?;

                info!(agent_id = %agent.id, hostname = %agent.hostname, "agent registered");
                Ok(Registration {
                    agent,
                    outcome: RegisterOutcome::Created,
                })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> SentraResult<Agent> {
        self.agents.get_by_id(organization_id, id).await
    }

    pub async fn list(
        &self,
        organization_id: Uuid,
        status: Option<AgentStatus>,
        pagination: Pagination,
    ) -> SentraResult<PaginatedResult<Agent>> {
        self.agents.list(organization_id, status, pagination).await
    }

    /// Operator update of config and status.
    pub async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: UpdateAgent,
    ) -> SentraResult<Agent> {
        self.agents.update(organization_id, id, input).await
    }

    pub async fn delete(&self, organization_id: Uuid, id: Uuid) -> SentraResult<()> {
        self.agents.delete(organization_id, id).await?;
        info!(agent_id = %id, "agent deleted");
        Ok(())
    }
}
