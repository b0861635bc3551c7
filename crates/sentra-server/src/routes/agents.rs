//! Agent, telemetry, alert, and command endpoints.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use sentra_core::models::agent::{AgentStatus, UpdateAgent};
use sentra_core::models::alert::AlertSeverity;
use sentra_core::models::command::CommandStatus;
use sentra_core::repository::{AlertFilter, MetricQuery, Pagination};
use sentra_telemetry::registry::{RegisterAgentInput, RegisterOutcome};
use sentra_telemetry::service::IngestInput;
use serde::Deserialize;
use serde_json::{Value, json};
use surrealdb::Connection;
use uuid::Uuid;

use crate::auth::{require_bearer, require_service_key};
use crate::dto::{AgentResponse, AlertResponse, CommandResponse};
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: u64 = 100;

/// `POST /api/agents/register`: upsert by hostname; 201 for a new
/// agent, 200 for a refresh. The credential is included in both cases
/// (agents may have lost it).
pub async fn register<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Json(body): Json<RegisterAgentInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let caller = require_service_key(&state, &headers).await?;

    let registration = state.agents.register(caller.organization_id, body).await?;

    let status_code = match registration.outcome {
        RegisterOutcome::Created => StatusCode::CREATED,
        RegisterOutcome::Updated => StatusCode::OK,
    };

    Ok((
        status_code,
        Json(json!({
            "id": registration.agent.id,
            "apiKey": registration.agent.api_key,
            "subscriptionUrl": state.settings.subscription_url,
            "status": registration.outcome,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListAgentsQuery {
    pub status: Option<AgentStatus>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// `GET /api/agents`
pub async fn list<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Query(query): Query<ListAgentsQuery>,
) -> Result<Json<Value>, ApiError> {
    let user = require_bearer(&state, &headers)?;

    let page = state
        .agents
        .list(
            user.organization_id,
            query.status,
            Pagination {
                offset: query.offset.unwrap_or(0),
                limit: query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
            },
        )
        .await?;

    let agents: Vec<AgentResponse> = page.items.into_iter().map(Into::into).collect();
    Ok(Json(json!({
        "agents": agents,
        "total": page.total,
        "limit": page.limit,
        "offset": page.offset,
    })))
}

/// `GET /api/agents/{id}`
pub async fn get<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<AgentResponse>, ApiError> {
    let user = require_bearer(&state, &headers)?;
    let agent = state.agents.get(user.organization_id, id).await?;
    Ok(Json(agent.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAgentBody {
    pub config: Option<BTreeMap<String, Value>>,
    pub status: Option<AgentStatus>,
}

/// `PUT /api/agents/{id}`: operator update of config/status.
pub async fn update<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAgentBody>,
) -> Result<Json<AgentResponse>, ApiError> {
    let user = require_bearer(&state, &headers)?;

    let agent = state
        .agents
        .update(
            user.organization_id,
            id,
            UpdateAgent {
                config: body.config,
                status: body.status,
                ..UpdateAgent::default()
            },
        )
        .await?;

    Ok(Json(agent.into()))
}

/// `DELETE /api/agents/{id}`
pub async fn remove<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user = require_bearer(&state, &headers)?;
    state.agents.delete(user.organization_id, id).await?;
    Ok(Json(json!({ "message": "Agent deleted successfully" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMetricsBody {
    pub metric_type: String,
    pub metric_data: Value,
    pub timestamp: Option<DateTime<Utc>>,
}

/// `POST /api/agents/{id}/metrics`: persist the batch and return any
/// alerts it raised.
pub async fn submit_metrics<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitMetricsBody>,
) -> Result<Json<Value>, ApiError> {
    let caller = require_service_key(&state, &headers).await?;

    let outcome = state
        .telemetry
        .ingest(
            caller.organization_id,
            id,
            IngestInput {
                metric_type: body.metric_type,
                metric_data: body.metric_data,
                timestamp: body.timestamp,
            },
        )
        .await?;

    Ok(Json(json!({
        "status": "received",
        "alerts": outcome.alerts,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMetricsQuery {
    pub metric_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
}

/// `GET /api/agents/{id}/metrics`
pub async fn list_metrics<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Query(query): Query<ListMetricsQuery>,
) -> Result<Json<Value>, ApiError> {
    let user = require_bearer(&state, &headers)?;

    let metrics = state
        .telemetry
        .list_metrics(
            user.organization_id,
            id,
            MetricQuery {
                metric_type: query.metric_type,
                from: query.from,
                to: query.to,
                limit: query.limit,
            },
        )
        .await?;

    let metrics: Vec<Value> = metrics
        .into_iter()
        .map(|m| {
            json!({
                "id": m.id,
                "metricType": m.metric_type,
                "metricData": m.metric_data,
                "timestamp": m.timestamp,
            })
        })
        .collect();

    Ok(Json(json!({ "metrics": metrics })))
}

#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    pub resolved: Option<bool>,
    pub severity: Option<AlertSeverity>,
    pub limit: Option<u64>,
}

/// `GET /api/agents/{id}/alerts`
pub async fn list_alerts<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Query(query): Query<ListAlertsQuery>,
) -> Result<Json<Value>, ApiError> {
    let user = require_bearer(&state, &headers)?;

    let alerts = state
        .telemetry
        .list_alerts(
            user.organization_id,
            id,
            AlertFilter {
                resolved: query.resolved,
                severity: query.severity,
                limit: query.limit,
            },
        )
        .await?;

    let alerts: Vec<AlertResponse> = alerts.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "alerts": alerts })))
}

/// `PUT /api/agents/{id}/alerts/{alert_id}/resolve`
pub async fn resolve_alert<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Path((id, alert_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<AlertResponse>, ApiError> {
    let user = require_bearer(&state, &headers)?;

    let alert = state
        .telemetry
        .resolve_alert(user.organization_id, id, alert_id, user.user_id)
        .await?;

    Ok(Json(alert.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommandBody {
    pub command_type: String,
    pub command_data: Value,
}

/// `POST /api/agents/{id}/commands`
pub async fn create_command<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateCommandBody>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let user = require_bearer(&state, &headers)?;

    let command = state
        .commands
        .enqueue(
            user.organization_id,
            id,
            body.command_type,
            body.command_data,
            user.user_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(command.into())))
}

#[derive(Debug, Deserialize)]
pub struct ListCommandsQuery {
    pub status: Option<CommandStatus>,
    pub limit: Option<u64>,
}

/// `GET /api/agents/{id}/commands`
pub async fn list_commands<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Query(query): Query<ListCommandsQuery>,
) -> Result<Json<Value>, ApiError> {
    let user = require_bearer(&state, &headers)?;

    let commands = state
        .commands
        .list(
            user.organization_id,
            id,
            query.status,
            query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
        )
        .await?;

    let commands: Vec<CommandResponse> = commands.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "commands": commands })))
}
