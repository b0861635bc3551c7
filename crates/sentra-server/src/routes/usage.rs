//! Usage metering endpoints.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use sentra_core::models::usage::CreateUsageRecord;
use sentra_license::service::SummaryPeriod;
use serde::Deserialize;
use serde_json::{Value, json};
use surrealdb::Connection;
use uuid::Uuid;

use crate::auth::{require_bearer, require_service_key};
use crate::dto::UsageSummaryEntry;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUsageBody {
    pub license_id: Option<Uuid>,
    pub product_id: String,
    pub event_type: String,
    pub quantity: Option<u64>,
    pub metadata: Option<BTreeMap<String, Value>>,
}

/// `POST /api/usage/record`
pub async fn record<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Json(body): Json<RecordUsageBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let caller = require_service_key(&state, &headers).await?;

    state
        .licenses
        .record_usage(CreateUsageRecord {
            organization_id: caller.organization_id,
            license_id: body.license_id,
            product_id: body.product_id,
            event_type: body.event_type,
            quantity: body.quantity.unwrap_or(1),
            metadata: body.metadata.unwrap_or_default(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "status": "recorded" }))))
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub period: Option<SummaryPeriod>,
}

/// `GET /api/usage/summary?period=day|week|month`
pub async fn summary<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Value>, ApiError> {
    let user = require_bearer(&state, &headers)?;
    let period = query.period.unwrap_or(SummaryPeriod::Month);

    let rows = state
        .licenses
        .usage_summary(user.organization_id, period)
        .await?;

    let summary: Vec<UsageSummaryEntry> = rows.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "summary": summary })))
}
