//! SurrealDB implementation of [`ApiKeyRepository`].

use chrono::{DateTime, Utc};
use sentra_core::error::SentraResult;
use sentra_core::models::api_key::{ApiKey, NewApiKey};
use sentra_core::repository::ApiKeyRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ApiKeyRow {
    organization_id: String,
    name: String,
    key_hash: String,
    scopes: Vec<String>,
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
    last_used: Option<DateTime<Utc>>,
    usage_count: u64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ApiKeyRowWithId {
    record_id: String,
    organization_id: String,
    name: String,
    key_hash: String,
    scopes: Vec<String>,
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
    last_used: Option<DateTime<Utc>>,
    usage_count: u64,
    created_at: DateTime<Utc>,
}

impl ApiKeyRow {
    fn into_api_key(self, id: Uuid) -> Result<ApiKey, DbError> {
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Corrupt(format!("invalid organization UUID: {e}")))?;
        Ok(ApiKey {
            id,
            organization_id,
            name: self.name,
            key_hash: self.key_hash,
            scopes: self.scopes,
            is_active: self.is_active,
            expires_at: self.expires_at,
            last_used: self.last_used,
            usage_count: self.usage_count,
            created_at: self.created_at,
        })
    }
}

impl ApiKeyRowWithId {
    fn try_into_api_key(self) -> Result<ApiKey, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Corrupt(format!("invalid organization UUID: {e}")))?;
        Ok(ApiKey {
            id,
            organization_id,
            name: self.name,
            key_hash: self.key_hash,
            scopes: self.scopes,
            is_active: self.is_active,
            expires_at: self.expires_at,
            last_used: self.last_used,
            usage_count: self.usage_count,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the API key repository.
pub struct SurrealApiKeyRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealApiKeyRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealApiKeyRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ApiKeyRepository for SurrealApiKeyRepository<C> {
    async fn create(&self, input: NewApiKey) -> SentraResult<ApiKey> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('api_key', $id) SET \
                 organization_id = $organization_id, \
                 name = $name, \
                 key_hash = $key_hash, \
                 scopes = $scopes, \
                 expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("name", input.name))
            .bind(("key_hash", input.key_hash))
            .bind(("scopes", input.scopes))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<ApiKeyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "api_key".into(),
            id: id_str,
        })?;

        Ok(row.into_api_key(id)?)
    }

    async fn get_by_hash(&self, key_hash: &str) -> SentraResult<ApiKey> {
        let hash_owned = key_hash.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM api_key WHERE key_hash = $key_hash",
            )
            .bind(("key_hash", hash_owned))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApiKeyRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "api_key".into(),
            id: "hash=<redacted>".into(),
        })?;

        Ok(row.try_into_api_key()?)
    }

    async fn record_use(&self, id: Uuid) -> SentraResult<()> {
        self.db
            .query(
                "UPDATE type::record('api_key', $id) SET \
                 usage_count += 1, last_used = time::now()",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        Ok(())
    }
}
