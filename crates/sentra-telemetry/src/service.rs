//! Telemetry ingestion with synchronous alert evaluation.

use chrono::{DateTime, Utc};
use sentra_core::error::{SentraError, SentraResult};
use sentra_core::models::alert::{AgentAlert, AlertSeverity, CreateAgentAlert};
use sentra_core::models::metric::{AgentMetric, CreateAgentMetric};
use sentra_core::repository::{AgentRepository, AlertFilter, AlertRepository, MetricQuery, MetricRepository};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::thresholds;

/// One metric submission from an agent.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestInput {
    pub metric_type: String,
    pub metric_data: Value,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Alert summary returned to the submitting agent.
#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub message: String,
}

/// Result of an ingestion call: the alerts that were actually
/// persisted for this submission.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub alerts: Vec<AlertSummary>,
}

/// Telemetry service.
///
/// Generic over repository implementations so the engine has no
/// dependency on the database crate.
pub struct TelemetryService<A, M, L>
where
    A: AgentRepository,
    M: MetricRepository,
    L: AlertRepository,
{
    agents: A,
    metrics: M,
    alerts: L,
}

impl<A, M, L> TelemetryService<A, M, L>
where
    A: AgentRepository,
    M: MetricRepository,
    L: AlertRepository,
{
    pub fn new(agents: A, metrics: M, alerts: L) -> Self {
        Self {
            agents,
            metrics,
            alerts,
        }
    }

    /// Ingest one metric batch for an agent.
    ///
    /// The agent must belong to the calling organization. Threshold
    /// evaluation runs synchronously and the returned summaries cover
    /// exactly the alert rows persisted by this call, so an alert
    /// write failure fails the whole ingestion.
    pub async fn ingest(
        &self,
        organization_id: Uuid,
        agent_id: Uuid,
        input: IngestInput,
    ) -> SentraResult<IngestOutcome> {
        // 1. Tenant check: unknown agents (or another org's agents)
        //    surface as NotFound.
        let agent = self.agents.get_by_id(organization_id, agent_id).await?;

        let now = Utc::now();
        let timestamp = input.timestamp.unwrap_or(now);

        // 2. Persist the metric row.
        self.metrics
            .append(CreateAgentMetric {
                agent_id: agent.id,
                metric_type: input.metric_type.clone(),
                metric_data: input.metric_data.clone(),
                timestamp,
            })
            .await?;

        // 3. The submission doubles as a liveness signal.
        self.agents.touch_seen(agent.id, now).await?;

        // 4. Evaluate thresholds and persist every breach. No
        //    dedup: a repeated breach creates a fresh alert row.
        let drafts = thresholds::evaluate(&input.metric_type, &input.metric_data);
        let mut summaries = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let alert = self
                .alerts
                .create(CreateAgentAlert {
                    agent_id: agent.id,
                    alert_type: draft.alert_type.into(),
                    severity: draft.severity,
                    message: draft.message,
                    details: draft.details,
                })
                .await?;

            info!(
                agent_id = %agent.id,
                alert_id = %alert.id,
                alert_type = %alert.alert_type,
                severity = alert.severity.as_str(),
                "alert created"
            );

            summaries.push(AlertSummary {
                alert_type: alert.alert_type,
                severity: alert.severity,
                message: alert.message,
            });
        }

        debug!(
            agent_id = %agent.id,
            metric_type = %input.metric_type,
            alerts = summaries.len(),
            "metrics ingested"
        );

        Ok(IngestOutcome { alerts: summaries })
    }

    /// Metrics recorded for an agent, newest first.
    pub async fn list_metrics(
        &self,
        organization_id: Uuid,
        agent_id: Uuid,
        query: MetricQuery,
    ) -> SentraResult<Vec<AgentMetric>> {
        let agent = self.agents.get_by_id(organization_id, agent_id).await?;
        self.metrics.list(agent.id, query).await
    }

    /// Alerts recorded for an agent, newest first.
    pub async fn list_alerts(
        &self,
        organization_id: Uuid,
        agent_id: Uuid,
        filter: AlertFilter,
    ) -> SentraResult<Vec<AgentAlert>> {
        let agent = self.agents.get_by_id(organization_id, agent_id).await?;
        self.alerts.list(agent.id, filter).await
    }

    /// Explicit operator resolution. The transition is terminal: a
    /// second resolve attempt fails and never re-evaluates the
    /// originating metric.
    pub async fn resolve_alert(
        &self,
        organization_id: Uuid,
        agent_id: Uuid,
        alert_id: Uuid,
        resolved_by: Uuid,
    ) -> SentraResult<AgentAlert> {
        // Scope the alert to the caller's organization via its agent.
        let agent = self.agents.get_by_id(organization_id, agent_id).await?;
        let alert = self.alerts.get_by_id(alert_id).await?;
        if alert.agent_id != agent.id {
            return Err(SentraError::NotFound {
                entity: "agent_alert".into(),
                id: alert_id.to_string(),
            });
        }

        let resolved = self.alerts.resolve(alert_id, resolved_by, Utc::now()).await?;
        info!(alert_id = %alert_id, resolved_by = %resolved_by, "alert resolved");
        Ok(resolved)
    }
}
