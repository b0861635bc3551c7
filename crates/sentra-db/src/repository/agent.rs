//! SurrealDB implementation of [`AgentRepository`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sentra_core::error::SentraResult;
use sentra_core::models::agent::{Agent, AgentStatus, NewAgent, UpdateAgent};
use sentra_core::repository::{AgentRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AgentRow {
    organization_id: String,
    hostname: String,
    ip_address: Option<String>,
    os_type: String,
    os_version: Option<String>,
    agent_version: String,
    api_key: String,
    status: String,
    last_seen: Option<DateTime<Utc>>,
    config: serde_json::Value,
    license_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AgentRowWithId {
    record_id: String,
    organization_id: String,
    hostname: String,
    ip_address: Option<String>,
    os_type: String,
    os_version: Option<String>,
    agent_version: String,
    api_key: String,
    status: String,
    last_seen: Option<DateTime<Utc>>,
    config: serde_json::Value,
    license_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<AgentStatus, DbError> {
    match s {
        "ACTIVE" => Ok(AgentStatus::Active),
        "INACTIVE" => Ok(AgentStatus::Inactive),
        "ERROR" => Ok(AgentStatus::Error),
        other => Err(DbError::Corrupt(format!("unknown agent status: {other}"))),
    }
}

fn parse_config(
    value: serde_json::Value,
) -> Result<BTreeMap<String, serde_json::Value>, DbError> {
    serde_json::from_value(value)
        .map_err(|e| DbError::Corrupt(format!("invalid agent config: {e}")))
}

fn parse_license_id(raw: Option<String>) -> Result<Option<Uuid>, DbError> {
    raw.map(|s| {
        Uuid::parse_str(&s).map_err(|e| DbError::Corrupt(format!("invalid license UUID: {e}")))
    })
    .transpose()
}

impl AgentRow {
    fn into_agent(self, id: Uuid) -> Result<Agent, DbError> {
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Corrupt(format!("invalid organization UUID: {e}")))?;
        Ok(Agent {
            id,
            organization_id,
            hostname: self.hostname,
            ip_address: self.ip_address,
            os_type: self.os_type,
            os_version: self.os_version,
            agent_version: self.agent_version,
            api_key: self.api_key,
            status: parse_status(&self.status)?,
            last_seen: self.last_seen,
            config: parse_config(self.config)?,
            license_id: parse_license_id(self.license_id)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl AgentRowWithId {
    fn try_into_agent(self) -> Result<Agent, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Corrupt(format!("invalid organization UUID: {e}")))?;
        Ok(Agent {
            id,
            organization_id,
            hostname: self.hostname,
            ip_address: self.ip_address,
            os_type: self.os_type,
            os_version: self.os_version,
            agent_version: self.agent_version,
            api_key: self.api_key,
            status: parse_status(&self.status)?,
            last_seen: self.last_seen,
            config: parse_config(self.config)?,
            license_id: parse_license_id(self.license_id)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Agent repository.
pub struct SurrealAgentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealAgentRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealAgentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AgentRepository for SurrealAgentRepository<C> {
    async fn create(&self, input: NewAgent) -> SentraResult<Agent> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let config = serde_json::to_value(&input.config)
            .map_err(|e| DbError::Corrupt(format!("unserializable config: {e}")))?;

        let result = self
            .db
            .query(
                "CREATE type::record('agent', $id) SET \
                 organization_id = $organization_id, \
                 hostname = $hostname, \
                 ip_address = $ip_address, \
                 os_type = $os_type, \
                 os_version = $os_version, \
                 agent_version = $agent_version, \
                 api_key = $api_key, \
                 status = 'ACTIVE', \
                 config = $config, \
                 license_id = $license_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("hostname", input.hostname))
            .bind(("ip_address", input.ip_address))
            .bind(("os_type", input.os_type))
            .bind(("os_version", input.os_version))
            .bind(("agent_version", input.agent_version))
            .bind(("api_key", input.api_key))
            .bind(("config", config))
            .bind(("license_id", input.license_id.map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<AgentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agent".into(),
            id: id_str,
        })?;

        Ok(row.into_agent(id)?)
    }

    async fn get_by_id(&self, organization_id: Uuid, id: Uuid) -> SentraResult<Agent> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('agent', $id) \
                 WHERE organization_id = $organization_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AgentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agent".into(),
            id: id_str,
        })?;

        Ok(row.into_agent(id)?)
    }

    async fn get_by_hostname(
        &self,
        organization_id: Uuid,
        hostname: &str,
    ) -> SentraResult<Agent> {
        let hostname_owned = hostname.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM agent \
                 WHERE organization_id = $organization_id \
                   AND hostname = $hostname",
            )
            .bind(("organization_id", organization_id.to_string()))
            .bind(("hostname", hostname_owned))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AgentRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agent".into(),
            id: format!("hostname={hostname}"),
        })?;

        Ok(row.try_into_agent()?)
    }

    async fn get_by_api_key(&self, api_key: &str) -> SentraResult<Agent> {
        let key_owned = api_key.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM agent \
                 WHERE api_key = $api_key",
            )
            .bind(("api_key", key_owned))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AgentRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agent".into(),
            id: "api_key=<redacted>".into(),
        })?;

        Ok(row.try_into_agent()?)
    }

    async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: UpdateAgent,
    ) -> SentraResult<Agent> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.ip_address.is_some() {
            sets.push("ip_address = $ip_address");
        }
        if input.os_type.is_some() {
            sets.push("os_type = $os_type");
        }
        if input.os_version.is_some() {
            sets.push("os_version = $os_version");
        }
        if input.agent_version.is_some() {
            sets.push("agent_version = $agent_version");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.config.is_some() {
            sets.push("config = $config");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('agent', $id) SET {} \
             WHERE organization_id = $organization_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("organization_id", organization_id.to_string()));

        if let Some(ip_address) = input.ip_address {
            builder = builder.bind(("ip_address", ip_address));
        }
        if let Some(os_type) = input.os_type {
            builder = builder.bind(("os_type", os_type));
        }
        if let Some(os_version) = input.os_version {
            builder = builder.bind(("os_version", os_version));
        }
        if let Some(agent_version) = input.agent_version {
            builder = builder.bind(("agent_version", agent_version));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status.as_str()));
        }
        if let Some(config) = input.config {
            let config = serde_json::to_value(&config)
                .map_err(|e| DbError::Corrupt(format!("unserializable config: {e}")))?;
            builder = builder.bind(("config", config));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<AgentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agent".into(),
            id: id_str,
        })?;

        Ok(row.into_agent(id)?)
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> SentraResult<()> {
        // Verify existence within the organization first so a missing
        // agent surfaces as NotFound rather than a silent no-op.
        self.get_by_id(organization_id, id).await?;

        self.db
            .query(
                "DELETE type::record('agent', $id) \
                 WHERE organization_id = $organization_id",
            )
            .bind(("id", id.to_string()))
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(
        &self,
        organization_id: Uuid,
        status: Option<AgentStatus>,
        pagination: Pagination,
    ) -> SentraResult<PaginatedResult<Agent>> {
        let org_str = organization_id.to_string();

        let status_clause = if status.is_some() {
            " AND status = $status"
        } else {
            ""
        };

        let count_query = format!(
            "SELECT count() AS total FROM agent \
             WHERE organization_id = $organization_id{status_clause} GROUP ALL"
        );
        let mut count_builder = self
            .db
            .query(&count_query)
            .bind(("organization_id", org_str.clone()));
        if let Some(status) = status {
            count_builder = count_builder.bind(("status", status.as_str()));
        }
        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let list_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM agent \
             WHERE organization_id = $organization_id{status_clause} \
             ORDER BY last_seen DESC \
             LIMIT $limit START $offset"
        );
        let mut builder = self
            .db
            .query(&list_query)
            .bind(("organization_id", org_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(status) = status {
            builder = builder.bind(("status", status.as_str()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<AgentRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_agent())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn touch_seen(&self, id: Uuid, at: DateTime<Utc>) -> SentraResult<()> {
        self.db
            .query(
                "UPDATE type::record('agent', $id) SET \
                 last_seen = $at, status = 'ACTIVE'",
            )
            .bind(("id", id.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        Ok(())
    }
}
