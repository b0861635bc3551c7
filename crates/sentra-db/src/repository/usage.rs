//! SurrealDB implementation of [`UsageRepository`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sentra_core::error::SentraResult;
use sentra_core::models::usage::{CreateUsageRecord, UsageRecord, UsageSummaryRow};
use sentra_core::repository::UsageRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct UsageRow {
    organization_id: String,
    license_id: Option<String>,
    product_id: String,
    event_type: String,
    quantity: u64,
    metadata: serde_json::Value,
    recorded_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct SummaryRow {
    product_id: String,
    event_type: String,
    total_quantity: u64,
}

fn parse_metadata(
    value: serde_json::Value,
) -> Result<BTreeMap<String, serde_json::Value>, DbError> {
    serde_json::from_value(value)
        .map_err(|e| DbError::Corrupt(format!("invalid usage metadata: {e}")))
}

impl UsageRow {
    fn into_record(self, id: Uuid) -> Result<UsageRecord, DbError> {
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Corrupt(format!("invalid organization UUID: {e}")))?;
        let license_id = self
            .license_id
            .map(|s| {
                Uuid::parse_str(&s)
                    .map_err(|e| DbError::Corrupt(format!("invalid license UUID: {e}")))
            })
            .transpose()?;
        Ok(UsageRecord {
            id,
            organization_id,
            license_id,
            product_id: self.product_id,
            event_type: self.event_type,
            quantity: self.quantity,
            metadata: parse_metadata(self.metadata)?,
            recorded_at: self.recorded_at,
        })
    }
}

/// SurrealDB implementation of the usage ledger.
pub struct SurrealUsageRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealUsageRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealUsageRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UsageRepository for SurrealUsageRepository<C> {
    async fn append(&self, input: CreateUsageRecord) -> SentraResult<UsageRecord> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let metadata = serde_json::to_value(&input.metadata)
            .map_err(|e| DbError::Corrupt(format!("unserializable metadata: {e}")))?;

        let result = self
            .db
            .query(
                "CREATE type::record('usage_record', $id) SET \
                 organization_id = $organization_id, \
                 license_id = $license_id, \
                 product_id = $product_id, \
                 event_type = $event_type, \
                 quantity = $quantity, \
                 metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("license_id", input.license_id.map(|u| u.to_string())))
            .bind(("product_id", input.product_id))
            .bind(("event_type", input.event_type))
            .bind(("quantity", input.quantity))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<UsageRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "usage_record".into(),
            id: id_str,
        })?;

        Ok(row.into_record(id)?)
    }

    async fn summarize(
        &self,
        organization_id: Uuid,
        from: DateTime<Utc>,
    ) -> SentraResult<Vec<UsageSummaryRow>> {
        let mut result = self
            .db
            .query(
                "SELECT product_id, event_type, \
                 math::sum(quantity) AS total_quantity \
                 FROM usage_record \
                 WHERE organization_id = $organization_id \
                   AND recorded_at >= $from \
                 GROUP BY product_id, event_type",
            )
            .bind(("organization_id", organization_id.to_string()))
            .bind(("from", from))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SummaryRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| UsageSummaryRow {
                product_id: row.product_id,
                event_type: row.event_type,
                total_quantity: row.total_quantity,
            })
            .collect())
    }
}
