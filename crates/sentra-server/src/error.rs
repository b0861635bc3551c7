//! Operational error mapping to HTTP responses.
//!
//! Business outcomes (invalid license, capacity exceeded, …) never
//! pass through here; they are 200-level payloads. This type covers
//! the operational class only: bad requests, missing resources,
//! cross-tenant denials, and datastore failures.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sentra_core::error::SentraError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed request body or query parameters.
    BadRequest(String),
    /// Anything surfaced by the domain layer.
    Sentra(SentraError),
}

impl From<SentraError> for ApiError {
    fn from(err: SentraError) -> Self {
        ApiError::Sentra(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Sentra(err) => match &err {
                SentraError::NotFound { entity, .. } => {
                    (StatusCode::NOT_FOUND, format!("{entity} not found"))
                }
                SentraError::AlreadyExists { entity } => {
                    (StatusCode::CONFLICT, format!("{entity} already exists"))
                }
                SentraError::AuthenticationFailed { reason } => {
                    (StatusCode::UNAUTHORIZED, reason.clone())
                }
                SentraError::AuthorizationDenied { reason } => {
                    (StatusCode::FORBIDDEN, reason.clone())
                }
                SentraError::Validation { message } => {
                    (StatusCode::BAD_REQUEST, message.clone())
                }
                SentraError::RateLimited => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "Too many requests".to_string(),
                ),
                SentraError::Database(_) | SentraError::Crypto(_) | SentraError::Internal(_) => {
                    // Log server-side; never leak detail to the caller.
                    error!(error = %err, "internal error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
