//! Organization registry endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use sentra_core::error::SentraError;
use sentra_core::models::organization::CreateOrganization;
use sentra_core::repository::OrganizationRepository;
use surrealdb::Connection;
use uuid::Uuid;

use crate::auth::{require_admin, require_bearer};
use crate::dto::OrganizationResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/organizations` (admin only)
pub async fn create<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Json(body): Json<CreateOrganization>,
) -> Result<(StatusCode, Json<OrganizationResponse>), ApiError> {
    require_admin(&state, &headers)?;

    // Domains are unique; surface a duplicate as a conflict rather
    // than a datastore error.
    if state
        .organization_repo
        .get_by_domain(&body.domain)
        .await
        .is_ok()
    {
        return Err(SentraError::AlreadyExists {
            entity: "organization".into(),
        }
        .into());
    }

    let organization = state.organization_repo.create(body).await?;
    Ok((StatusCode::CREATED, Json(organization.into())))
}

/// `GET /api/organizations/{id}`
pub async fn get<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let user = require_bearer(&state, &headers)?;

    if !user.is_admin() && user.organization_id != id {
        return Err(SentraError::AuthorizationDenied {
            reason: "cannot read another organization".into(),
        }
        .into());
    }

    let organization = state.organization_repo.get_by_id(id).await?;
    Ok(Json(organization.into()))
}
