//! License endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use sentra_core::error::SentraError;
use sentra_core::models::license::LicenseStatus;
use sentra_core::repository::{LicenseRepository, Pagination, ValidationLogRepository};
use sentra_license::service::{CreateLicenseInput, ValidateInput, ValidationOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use surrealdb::Connection;
use uuid::Uuid;

use crate::auth::{require_admin, require_bearer, require_service_key};
use crate::dto::{LicenseDetail, LicenseSummary, ValidationEntry};
use crate::error::ApiError;
use crate::state::AppState;

/// Audit entries embedded in a license detail response.
const RECENT_VALIDATIONS: u64 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateBody {
    pub license_key: String,
    pub product_id: Option<String>,
    pub machine_id: Option<String>,
}

/// `POST /api/licenses/validate`
///
/// Business outcomes (valid or not) are always HTTP 200; only
/// operational failures use error statuses.
pub async fn validate<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Json(body): Json<ValidateBody>,
) -> Result<Json<ValidationOutcome>, ApiError> {
    let caller = require_service_key(&state, &headers).await?;

    if !state.validate_limiter.allow(&caller.caller) {
        return Err(SentraError::RateLimited.into());
    }

    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let outcome = state
        .licenses
        .validate(ValidateInput {
            license_key: body.license_key,
            product_id: body.product_id,
            machine_id: body.machine_id,
            ip_address,
            user_agent,
        })
        .await?;

    Ok(Json(outcome))
}

/// `POST /api/licenses/create` (admin only)
pub async fn create<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Json(body): Json<CreateLicenseInput>,
) -> Result<(StatusCode, Json<LicenseDetail>), ApiError> {
    require_admin(&state, &headers)?;

    let license = state.licenses.create_license(body).await?;
    Ok((StatusCode::CREATED, Json(license.into())))
}

/// `GET /api/licenses`: licenses of the caller's organization.
pub async fn list<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = require_bearer(&state, &headers)?;

    let page = state
        .license_repo
        .list_by_organization(user.organization_id, Pagination::default())
        .await?;

    let licenses: Vec<LicenseSummary> = page.items.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "licenses": licenses, "total": page.total })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseDetailWithAudit {
    #[serde(flatten)]
    pub license: LicenseDetail,
    pub recent_validations: Vec<ValidationEntry>,
}

/// `GET /api/licenses/{id}`: full detail plus recent audit entries.
pub async fn get<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<LicenseDetailWithAudit>, ApiError> {
    let user = require_bearer(&state, &headers)?;

    let license = state.license_repo.get_by_id(id).await?;
    if !user.is_admin() && license.organization_id != user.organization_id {
        return Err(SentraError::AuthorizationDenied {
            reason: "license belongs to another organization".into(),
        }
        .into());
    }

    let recent = state
        .validation_repo
        .list_recent(Some(license.id), RECENT_VALIDATIONS)
        .await?;

    Ok(Json(LicenseDetailWithAudit {
        license: license.into(),
        recent_validations: recent.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: LicenseStatus,
}

/// `PATCH /api/licenses/{id}/status` (admin only)
pub async fn update_status<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;

    let license = state.licenses.update_status(id, body.status).await?;
    Ok(Json(json!({
        "id": license.id,
        "status": license.status,
    })))
}
