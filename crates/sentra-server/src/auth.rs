//! Request authentication.
//!
//! Two disjoint schemes cover the endpoint surface:
//! - **Bearer JWT** (EdDSA-signed, issued by the identity provider) for
//!   operator and dashboard calls; verification here is purely
//!   stateless.
//! - **Service API key** (`X-Api-Key`) for product instances
//!   (`sk_…`, stored hashed and usage-counted) and monitoring agents
//!   (`agent_…`).

use axum::http::HeaderMap;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use sentra_core::error::{SentraError, SentraResult};
use sentra_core::repository::{AgentRepository, ApiKeyRepository};
use serde::{Deserialize, Serialize};
use surrealdb::Connection;
use uuid::Uuid;

use crate::state::AppState;

/// JWT claims expected in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject — user ID (UUID string).
    pub sub: String,
    /// Organization ID (UUID string).
    pub org_id: String,
    /// Role (`admin` or `member`).
    pub role: String,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// An authenticated operator (bearer token).
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: String,
}

impl UserContext {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// An authenticated service caller (API key).
#[derive(Debug, Clone)]
pub struct ServiceContext {
    pub organization_id: Uuid,
    /// Stable identity for rate limiting and audit.
    pub caller: String,
}

fn unauthorized(reason: &str) -> SentraError {
    SentraError::AuthenticationFailed {
        reason: reason.into(),
    }
}

fn header<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Authenticate a bearer token and return the operator context.
pub fn require_bearer<C: Connection>(
    state: &AppState<C>,
    headers: &HeaderMap,
) -> SentraResult<UserContext> {
    let token = header(headers, "authorization")
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized("missing bearer token"))?;

    let key = DecodingKey::from_ed_pem(state.auth.jwt_public_key_pem.as_bytes())
        .map_err(|e| SentraError::Crypto(format!("bad public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[&state.auth.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    let claims = jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => unauthorized("token has expired"),
            _ => unauthorized("invalid token"),
        })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| unauthorized("invalid token"))?;
    let organization_id =
        Uuid::parse_str(&claims.org_id).map_err(|_| unauthorized("invalid token"))?;

    Ok(UserContext {
        user_id,
        organization_id,
        role: claims.role,
    })
}

/// Authenticate a bearer token and require the `admin` role.
pub fn require_admin<C: Connection>(
    state: &AppState<C>,
    headers: &HeaderMap,
) -> SentraResult<UserContext> {
    let user = require_bearer(state, headers)?;
    if !user.is_admin() {
        return Err(SentraError::AuthorizationDenied {
            reason: "admin role required".into(),
        });
    }
    Ok(user)
}

/// Authenticate a service API key (`sk_…` or `agent_…`) and return the
/// calling organization.
pub async fn require_service_key<C: Connection>(
    state: &AppState<C>,
    headers: &HeaderMap,
) -> SentraResult<ServiceContext> {
    let raw = header(headers, "x-api-key").ok_or_else(|| unauthorized("missing API key"))?;

    if raw.starts_with("agent_") {
        let agent = state
            .agent_repo
            .get_by_api_key(raw)
            .await
            .map_err(|_| unauthorized("invalid API key"))?;

        return Ok(ServiceContext {
            organization_id: agent.organization_id,
            caller: format!("agent:{}", agent.id),
        });
    }

    if raw.starts_with("sk_") {
        let hash = sentra_license::keygen::hash_credential(raw);
        let key = state
            .api_key_repo
            .get_by_hash(&hash)
            .await
            .map_err(|_| unauthorized("invalid API key"))?;

        if !key.is_active {
            return Err(unauthorized("API key is inactive"));
        }
        if key.expires_at.is_some_and(|t| t < Utc::now()) {
            return Err(unauthorized("API key has expired"));
        }

        // Every authenticated use is counted.
        state.api_key_repo.record_use(key.id).await?;

        return Ok(ServiceContext {
            organization_id: key.organization_id,
            caller: format!("key:{}", key.id),
        });
    }

    Err(unauthorized("invalid API key"))
}
