//! Webhook registry endpoints.
//!
//! Registration only. Delivery is a separate concern consuming the
//! repository's `get_by_event` boundary.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use sentra_core::models::webhook::NewWebhook;
use sentra_core::repository::{Pagination, WebhookRepository};
use sentra_license::keygen;
use serde::Deserialize;
use serde_json::{Value, json};
use surrealdb::Connection;
use uuid::Uuid;

use crate::auth::require_bearer;
use crate::dto::WebhookResponse;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateWebhookBody {
    pub url: String,
    pub events: Vec<String>,
}

/// `POST /api/webhooks`. The raw signing secret is returned exactly
/// once; only its hash is stored.
pub async fn create<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Json(body): Json<CreateWebhookBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = require_bearer(&state, &headers)?;

    let secret = keygen::generate_webhook_secret();
    let webhook = state
        .webhook_repo
        .create(NewWebhook {
            organization_id: user.organization_id,
            url: body.url,
            events: body.events,
            secret_hash: keygen::hash_credential(&secret),
        })
        .await?;

    let response: WebhookResponse = webhook.into();
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "webhook": response,
            "secret": secret,
        })),
    ))
}

/// `GET /api/webhooks`
pub async fn list<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = require_bearer(&state, &headers)?;

    let page = state
        .webhook_repo
        .list(user.organization_id, Pagination::default())
        .await?;

    let webhooks: Vec<WebhookResponse> = page.items.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "webhooks": webhooks, "total": page.total })))
}

/// `DELETE /api/webhooks/{id}`
pub async fn remove<C: Connection>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user = require_bearer(&state, &headers)?;
    state.webhook_repo.delete(user.organization_id, id).await?;
    Ok(Json(json!({ "message": "Webhook deleted successfully" })))
}
