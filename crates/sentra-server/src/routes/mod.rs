//! HTTP route definitions.

mod agents;
mod licenses;
mod organizations;
mod usage;
mod webhooks;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use surrealdb::Connection;

use crate::state::AppState;

/// Build the HTTP API router over the shared application state.
pub fn build_router<C: Connection>(state: AppState<C>) -> Router {
    Router::new()
        // Licenses
        .route("/api/licenses/validate", post(licenses::validate))
        .route("/api/licenses/create", post(licenses::create))
        .route("/api/licenses", get(licenses::list))
        .route("/api/licenses/{id}", get(licenses::get))
        .route("/api/licenses/{id}/status", patch(licenses::update_status))
        // Organizations
        .route("/api/organizations", post(organizations::create))
        .route("/api/organizations/{id}", get(organizations::get))
        // Agents
        .route("/api/agents/register", post(agents::register))
        .route("/api/agents", get(agents::list))
        .route(
            "/api/agents/{id}",
            get(agents::get).put(agents::update).delete(agents::remove),
        )
        .route(
            "/api/agents/{id}/metrics",
            post(agents::submit_metrics).get(agents::list_metrics),
        )
        .route("/api/agents/{id}/alerts", get(agents::list_alerts))
        .route(
            "/api/agents/{id}/alerts/{alert_id}/resolve",
            put(agents::resolve_alert),
        )
        .route(
            "/api/agents/{id}/commands",
            post(agents::create_command).get(agents::list_commands),
        )
        // Usage metering
        .route("/api/usage/record", post(usage::record))
        .route("/api/usage/summary", get(usage::summary))
        // Webhook registry
        .route("/api/webhooks", post(webhooks::create).get(webhooks::list))
        .route("/api/webhooks/{id}", delete(webhooks::remove))
        .with_state(state)
}
