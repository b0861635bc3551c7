//! SurrealDB implementations of [`MetricRepository`], [`AlertRepository`],
//! and [`CommandRepository`].

use chrono::{DateTime, Utc};
use sentra_core::error::{SentraError, SentraResult};
use sentra_core::models::alert::{AgentAlert, AlertSeverity, CreateAgentAlert};
use sentra_core::models::command::{AgentCommand, CommandStatus, CreateAgentCommand};
use sentra_core::models::metric::{AgentMetric, CreateAgentMetric};
use sentra_core::repository::{
    AlertFilter, AlertRepository, CommandRepository, MetricQuery, MetricRepository,
};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

const DEFAULT_LIST_LIMIT: u64 = 100;

// -----------------------------------------------------------------------
// Metrics
// -----------------------------------------------------------------------

#[derive(Debug, SurrealValue)]
struct MetricRow {
    agent_id: String,
    metric_type: String,
    metric_data: serde_json::Value,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct MetricRowWithId {
    record_id: String,
    agent_id: String,
    metric_type: String,
    metric_data: serde_json::Value,
    timestamp: DateTime<Utc>,
}

fn parse_agent_id(raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Corrupt(format!("invalid agent UUID: {e}")))
}

impl MetricRow {
    fn into_metric(self, id: Uuid) -> Result<AgentMetric, DbError> {
        Ok(AgentMetric {
            id,
            agent_id: parse_agent_id(&self.agent_id)?,
            metric_type: self.metric_type,
            metric_data: self.metric_data,
            timestamp: self.timestamp,
        })
    }
}

impl MetricRowWithId {
    fn try_into_metric(self) -> Result<AgentMetric, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        Ok(AgentMetric {
            id,
            agent_id: parse_agent_id(&self.agent_id)?,
            metric_type: self.metric_type,
            metric_data: self.metric_data,
            timestamp: self.timestamp,
        })
    }
}

/// SurrealDB implementation of the metric store.
pub struct SurrealMetricRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealMetricRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealMetricRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MetricRepository for SurrealMetricRepository<C> {
    async fn append(&self, input: CreateAgentMetric) -> SentraResult<AgentMetric> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('agent_metric', $id) SET \
                 agent_id = $agent_id, \
                 metric_type = $metric_type, \
                 metric_data = $metric_data, \
                 timestamp = $timestamp",
            )
            .bind(("id", id_str.clone()))
            .bind(("agent_id", input.agent_id.to_string()))
            .bind(("metric_type", input.metric_type))
            .bind(("metric_data", input.metric_data))
            .bind(("timestamp", input.timestamp))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<MetricRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agent_metric".into(),
            id: id_str,
        })?;

        Ok(row.into_metric(id)?)
    }

    async fn list(&self, agent_id: Uuid, query: MetricQuery) -> SentraResult<Vec<AgentMetric>> {
        let mut wheres = vec!["agent_id = $agent_id"];
        if query.metric_type.is_some() {
            wheres.push("metric_type = $metric_type");
        }
        if query.from.is_some() {
            wheres.push("timestamp >= $from");
        }
        if query.to.is_some() {
            wheres.push("timestamp <= $to");
        }

        let sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM agent_metric \
             WHERE {} ORDER BY timestamp DESC LIMIT $limit",
            wheres.join(" AND ")
        );

        let mut builder = self
            .db
            .query(&sql)
            .bind(("agent_id", agent_id.to_string()))
            .bind(("limit", query.limit.unwrap_or(DEFAULT_LIST_LIMIT)));

        if let Some(metric_type) = query.metric_type {
            builder = builder.bind(("metric_type", metric_type));
        }
        if let Some(from) = query.from {
            builder = builder.bind(("from", from));
        }
        if let Some(to) = query.to {
            builder = builder.bind(("to", to));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<MetricRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| row.try_into_metric())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}

// -----------------------------------------------------------------------
// Alerts
// -----------------------------------------------------------------------

#[derive(Debug, SurrealValue)]
struct AlertRow {
    agent_id: String,
    alert_type: String,
    severity: String,
    message: String,
    details: serde_json::Value,
    resolved: bool,
    resolved_at: Option<DateTime<Utc>>,
    resolved_by: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AlertRowWithId {
    record_id: String,
    agent_id: String,
    alert_type: String,
    severity: String,
    message: String,
    details: serde_json::Value,
    resolved: bool,
    resolved_at: Option<DateTime<Utc>>,
    resolved_by: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_severity(s: &str) -> Result<AlertSeverity, DbError> {
    match s {
        "WARNING" => Ok(AlertSeverity::Warning),
        "ERROR" => Ok(AlertSeverity::Error),
        "CRITICAL" => Ok(AlertSeverity::Critical),
        other => Err(DbError::Corrupt(format!("unknown alert severity: {other}"))),
    }
}

fn parse_resolved_by(raw: Option<String>) -> Result<Option<Uuid>, DbError> {
    raw.map(|s| {
        Uuid::parse_str(&s).map_err(|e| DbError::Corrupt(format!("invalid resolver UUID: {e}")))
    })
    .transpose()
}

impl AlertRow {
    fn into_alert(self, id: Uuid) -> Result<AgentAlert, DbError> {
        Ok(AgentAlert {
            id,
            agent_id: parse_agent_id(&self.agent_id)?,
            alert_type: self.alert_type,
            severity: parse_severity(&self.severity)?,
            message: self.message,
            details: self.details,
            resolved: self.resolved,
            resolved_at: self.resolved_at,
            resolved_by: parse_resolved_by(self.resolved_by)?,
            created_at: self.created_at,
        })
    }
}

impl AlertRowWithId {
    fn try_into_alert(self) -> Result<AgentAlert, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        Ok(AgentAlert {
            id,
            agent_id: parse_agent_id(&self.agent_id)?,
            alert_type: self.alert_type,
            severity: parse_severity(&self.severity)?,
            message: self.message,
            details: self.details,
            resolved: self.resolved,
            resolved_at: self.resolved_at,
            resolved_by: parse_resolved_by(self.resolved_by)?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the alert repository.
pub struct SurrealAlertRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealAlertRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealAlertRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AlertRepository for SurrealAlertRepository<C> {
    async fn create(&self, input: CreateAgentAlert) -> SentraResult<AgentAlert> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('agent_alert', $id) SET \
                 agent_id = $agent_id, \
                 alert_type = $alert_type, \
                 severity = $severity, \
                 message = $message, \
                 details = $details",
            )
            .bind(("id", id_str.clone()))
            .bind(("agent_id", input.agent_id.to_string()))
            .bind(("alert_type", input.alert_type))
            .bind(("severity", input.severity.as_str()))
            .bind(("message", input.message))
            .bind(("details", input.details))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<AlertRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agent_alert".into(),
            id: id_str,
        })?;

        Ok(row.into_alert(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> SentraResult<AgentAlert> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('agent_alert', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AlertRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agent_alert".into(),
            id: id_str,
        })?;

        Ok(row.into_alert(id)?)
    }

    async fn list(&self, agent_id: Uuid, filter: AlertFilter) -> SentraResult<Vec<AgentAlert>> {
        let mut wheres = vec!["agent_id = $agent_id"];
        if filter.resolved.is_some() {
            wheres.push("resolved = $resolved");
        }
        if filter.severity.is_some() {
            wheres.push("severity = $severity");
        }

        let sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM agent_alert \
             WHERE {} ORDER BY created_at DESC LIMIT $limit",
            wheres.join(" AND ")
        );

        let mut builder = self
            .db
            .query(&sql)
            .bind(("agent_id", agent_id.to_string()))
            .bind(("limit", filter.limit.unwrap_or(DEFAULT_LIST_LIMIT)));

        if let Some(resolved) = filter.resolved {
            builder = builder.bind(("resolved", resolved));
        }
        if let Some(severity) = filter.severity {
            builder = builder.bind(("severity", severity.as_str()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<AlertRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| row.try_into_alert())
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn resolve(
        &self,
        id: Uuid,
        resolved_by: Uuid,
        at: DateTime<Utc>,
    ) -> SentraResult<AgentAlert> {
        let id_str = id.to_string();

        // Conditional on `resolved = false`: the transition is
        // terminal, so a second resolve must not overwrite the first
        // resolver or timestamp.
        let mut result = self
            .db
            .query(
                "UPDATE type::record('agent_alert', $id) SET \
                 resolved = true, \
                 resolved_at = $at, \
                 resolved_by = $resolved_by \
                 WHERE resolved = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("at", at))
            .bind(("resolved_by", resolved_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AlertRow> = result.take(0).map_err(DbError::from)?;

        match rows.into_iter().next() {
            Some(row) => Ok(row.into_alert(id)?),
            None => {
                // Either missing or already resolved.
                let existing = self.get_by_id(id).await?;
                debug_assert!(existing.resolved);
                Err(SentraError::Validation {
                    message: "alert is already resolved".into(),
                })
            }
        }
    }
}

// -----------------------------------------------------------------------
// Commands
// -----------------------------------------------------------------------

#[derive(Debug, SurrealValue)]
struct CommandRow {
    agent_id: String,
    command_type: String,
    command_data: serde_json::Value,
    status: String,
    created_by: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CommandRowWithId {
    record_id: String,
    agent_id: String,
    command_type: String,
    command_data: serde_json::Value,
    status: String,
    created_by: String,
    created_at: DateTime<Utc>,
}

fn parse_command_status(s: &str) -> Result<CommandStatus, DbError> {
    match s {
        "PENDING" => Ok(CommandStatus::Pending),
        "ACKED" => Ok(CommandStatus::Acked),
        "RUNNING" => Ok(CommandStatus::Running),
        "COMPLETED" => Ok(CommandStatus::Completed),
        "FAILED" => Ok(CommandStatus::Failed),
        other => Err(DbError::Corrupt(format!("unknown command status: {other}"))),
    }
}

impl CommandRow {
    fn into_command(self, id: Uuid) -> Result<AgentCommand, DbError> {
        let created_by = Uuid::parse_str(&self.created_by)
            .map_err(|e| DbError::Corrupt(format!("invalid creator UUID: {e}")))?;
        Ok(AgentCommand {
            id,
            agent_id: parse_agent_id(&self.agent_id)?,
            command_type: self.command_type,
            command_data: self.command_data,
            status: parse_command_status(&self.status)?,
            created_by,
            created_at: self.created_at,
        })
    }
}

impl CommandRowWithId {
    fn try_into_command(self) -> Result<AgentCommand, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let created_by = Uuid::parse_str(&self.created_by)
            .map_err(|e| DbError::Corrupt(format!("invalid creator UUID: {e}")))?;
        Ok(AgentCommand {
            id,
            agent_id: parse_agent_id(&self.agent_id)?,
            command_type: self.command_type,
            command_data: self.command_data,
            status: parse_command_status(&self.status)?,
            created_by,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the command queue repository.
pub struct SurrealCommandRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealCommandRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealCommandRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> CommandRepository for SurrealCommandRepository<C> {
    async fn create(&self, input: CreateAgentCommand) -> SentraResult<AgentCommand> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('agent_command', $id) SET \
                 agent_id = $agent_id, \
                 command_type = $command_type, \
                 command_data = $command_data, \
                 status = 'PENDING', \
                 created_by = $created_by",
            )
            .bind(("id", id_str.clone()))
            .bind(("agent_id", input.agent_id.to_string()))
            .bind(("command_type", input.command_type))
            .bind(("command_data", input.command_data))
            .bind(("created_by", input.created_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<CommandRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agent_command".into(),
            id: id_str,
        })?;

        Ok(row.into_command(id)?)
    }

    async fn list(
        &self,
        agent_id: Uuid,
        status: Option<CommandStatus>,
        limit: u64,
    ) -> SentraResult<Vec<AgentCommand>> {
        let status_clause = if status.is_some() {
            " AND status = $status"
        } else {
            ""
        };

        let sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM agent_command \
             WHERE agent_id = $agent_id{status_clause} \
             ORDER BY created_at DESC LIMIT $limit"
        );

        let mut builder = self
            .db
            .query(&sql)
            .bind(("agent_id", agent_id.to_string()))
            .bind(("limit", limit));

        if let Some(status) = status {
            builder = builder.bind(("status", status.as_str()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<CommandRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| row.try_into_command())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
