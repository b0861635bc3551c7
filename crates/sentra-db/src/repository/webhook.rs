//! SurrealDB implementation of [`WebhookRepository`].

use chrono::{DateTime, Utc};
use sentra_core::error::SentraResult;
use sentra_core::models::webhook::{NewWebhook, Webhook};
use sentra_core::repository::{PaginatedResult, Pagination, WebhookRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct WebhookRow {
    organization_id: String,
    url: String,
    events: Vec<String>,
    secret_hash: String,
    is_active: bool,
    last_triggered: Option<DateTime<Utc>>,
    success_count: u64,
    failure_count: u64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct WebhookRowWithId {
    record_id: String,
    organization_id: String,
    url: String,
    events: Vec<String>,
    secret_hash: String,
    is_active: bool,
    last_triggered: Option<DateTime<Utc>>,
    success_count: u64,
    failure_count: u64,
    created_at: DateTime<Utc>,
}

impl WebhookRow {
    fn into_webhook(self, id: Uuid) -> Result<Webhook, DbError> {
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Corrupt(format!("invalid organization UUID: {e}")))?;
        Ok(Webhook {
            id,
            organization_id,
            url: self.url,
            events: self.events,
            secret_hash: self.secret_hash,
            is_active: self.is_active,
            last_triggered: self.last_triggered,
            success_count: self.success_count,
            failure_count: self.failure_count,
            created_at: self.created_at,
        })
    }
}

impl WebhookRowWithId {
    fn try_into_webhook(self) -> Result<Webhook, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Corrupt(format!("invalid organization UUID: {e}")))?;
        Ok(Webhook {
            id,
            organization_id,
            url: self.url,
            events: self.events,
            secret_hash: self.secret_hash,
            is_active: self.is_active,
            last_triggered: self.last_triggered,
            success_count: self.success_count,
            failure_count: self.failure_count,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the webhook registry.
pub struct SurrealWebhookRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealWebhookRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealWebhookRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> WebhookRepository for SurrealWebhookRepository<C> {
    async fn create(&self, input: NewWebhook) -> SentraResult<Webhook> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('webhook', $id) SET \
                 organization_id = $organization_id, \
                 url = $url, \
                 events = $events, \
                 secret_hash = $secret_hash",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("url", input.url))
            .bind(("events", input.events))
            .bind(("secret_hash", input.secret_hash))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<WebhookRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "webhook".into(),
            id: id_str,
        })?;

        Ok(row.into_webhook(id)?)
    }

    async fn list(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> SentraResult<PaginatedResult<Webhook>> {
        let org_str = organization_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM webhook \
                 WHERE organization_id = $organization_id GROUP ALL",
            )
            .bind(("organization_id", org_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM webhook \
                 WHERE organization_id = $organization_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("organization_id", org_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<WebhookRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_webhook())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> SentraResult<()> {
        let id_str = id.to_string();

        // Verify existence within the organization first.
        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('webhook', $id) \
                 WHERE organization_id = $organization_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<WebhookRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "webhook".into(),
                id: id_str,
            }
            .into());
        }

        self.db
            .query(
                "DELETE type::record('webhook', $id) \
                 WHERE organization_id = $organization_id",
            )
            .bind(("id", id_str))
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_by_event(
        &self,
        organization_id: Uuid,
        event_type: &str,
    ) -> SentraResult<Vec<Webhook>> {
        let event_owned = event_type.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM webhook \
                 WHERE organization_id = $organization_id \
                   AND is_active = true \
                   AND $event IN events",
            )
            .bind(("organization_id", organization_id.to_string()))
            .bind(("event", event_owned))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<WebhookRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| row.try_into_webhook())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
