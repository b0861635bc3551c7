//! SurrealDB implementation of [`LicenseRepository`].
//!
//! Machine binding is a single conditional `UPDATE` so the
//! capacity-check-then-append sequence cannot interleave across
//! concurrent validations.

use chrono::{DateTime, Utc};
use sentra_core::error::SentraResult;
use sentra_core::models::license::{
    FeatureSet, License, LicenseStatus, LicenseTier, NewLicense,
};
use sentra_core::repository::{
    LicenseRepository, MachineBind, PaginatedResult, Pagination,
};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct LicenseRow {
    key: String,
    organization_id: String,
    tier: String,
    status: String,
    max_users: u64,
    max_products: u64,
    max_api_calls: u64,
    max_storage_bytes: u64,
    allowed_products: Vec<String>,
    features: serde_json::Value,
    start_date: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_trial: bool,
    trial_ends_at: Option<DateTime<Utc>>,
    machine_ids: Vec<String>,
    max_machines: u64,
    last_validated: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct LicenseRowWithId {
    record_id: String,
    key: String,
    organization_id: String,
    tier: String,
    status: String,
    max_users: u64,
    max_products: u64,
    max_api_calls: u64,
    max_storage_bytes: u64,
    allowed_products: Vec<String>,
    features: serde_json::Value,
    start_date: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_trial: bool,
    trial_ends_at: Option<DateTime<Utc>>,
    machine_ids: Vec<String>,
    max_machines: u64,
    last_validated: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

fn parse_tier(s: &str) -> Result<LicenseTier, DbError> {
    match s {
        "TRIAL" => Ok(LicenseTier::Trial),
        "STARTER" => Ok(LicenseTier::Starter),
        "PROFESSIONAL" => Ok(LicenseTier::Professional),
        "ENTERPRISE" => Ok(LicenseTier::Enterprise),
        "UNLIMITED" => Ok(LicenseTier::Unlimited),
        other => Err(DbError::Corrupt(format!("unknown license tier: {other}"))),
    }
}

fn parse_status(s: &str) -> Result<LicenseStatus, DbError> {
    match s {
        "ACTIVE" => Ok(LicenseStatus::Active),
        "SUSPENDED" => Ok(LicenseStatus::Suspended),
        "EXPIRED" => Ok(LicenseStatus::Expired),
        "CANCELLED" => Ok(LicenseStatus::Cancelled),
        other => Err(DbError::Corrupt(format!("unknown license status: {other}"))),
    }
}

fn parse_features(value: serde_json::Value) -> Result<FeatureSet, DbError> {
    serde_json::from_value(value)
        .map_err(|e| DbError::Corrupt(format!("invalid feature set: {e}")))
}

impl LicenseRow {
    fn into_license(self, id: Uuid) -> Result<License, DbError> {
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Corrupt(format!("invalid organization UUID: {e}")))?;
        Ok(License {
            id,
            key: self.key,
            organization_id,
            tier: parse_tier(&self.tier)?,
            status: parse_status(&self.status)?,
            max_users: self.max_users,
            max_products: self.max_products,
            max_api_calls: self.max_api_calls,
            max_storage_bytes: self.max_storage_bytes,
            allowed_products: self.allowed_products,
            features: parse_features(self.features)?,
            start_date: self.start_date,
            expires_at: self.expires_at,
            is_trial: self.is_trial,
            trial_ends_at: self.trial_ends_at,
            machine_ids: self.machine_ids,
            max_machines: self.max_machines,
            last_validated: self.last_validated,
            created_at: self.created_at,
        })
    }
}

impl LicenseRowWithId {
    fn try_into_license(self) -> Result<License, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Corrupt(format!("invalid organization UUID: {e}")))?;
        Ok(License {
            id,
            key: self.key,
            organization_id,
            tier: parse_tier(&self.tier)?,
            status: parse_status(&self.status)?,
            max_users: self.max_users,
            max_products: self.max_products,
            max_api_calls: self.max_api_calls,
            max_storage_bytes: self.max_storage_bytes,
            allowed_products: self.allowed_products,
            features: parse_features(self.features)?,
            start_date: self.start_date,
            expires_at: self.expires_at,
            is_trial: self.is_trial,
            trial_ends_at: self.trial_ends_at,
            machine_ids: self.machine_ids,
            max_machines: self.max_machines,
            last_validated: self.last_validated,
            created_at: self.created_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Pre-image of the machine set, captured by `RETURN BEFORE`.
#[derive(Debug, SurrealValue)]
struct MachineIdsRow {
    machine_ids: Vec<String>,
}

/// SurrealDB implementation of the License repository.
pub struct SurrealLicenseRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealLicenseRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealLicenseRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> LicenseRepository for SurrealLicenseRepository<C> {
    async fn create(&self, input: NewLicense) -> SentraResult<License> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let features = serde_json::to_value(&input.features)
            .map_err(|e| DbError::Corrupt(format!("unserializable feature set: {e}")))?;

        let result = self
            .db
            .query(
                "CREATE type::record('license', $id) SET \
                 key = $key, \
                 organization_id = $organization_id, \
                 tier = $tier, \
                 status = 'ACTIVE', \
                 max_users = $max_users, \
                 max_products = $max_products, \
                 max_api_calls = $max_api_calls, \
                 max_storage_bytes = $max_storage_bytes, \
                 allowed_products = $allowed_products, \
                 features = $features, \
                 expires_at = $expires_at, \
                 is_trial = $is_trial, \
                 trial_ends_at = $trial_ends_at, \
                 max_machines = $max_machines",
            )
            .bind(("id", id_str.clone()))
            .bind(("key", input.key))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("tier", input.tier.as_str()))
            .bind(("max_users", input.max_users))
            .bind(("max_products", input.max_products))
            .bind(("max_api_calls", input.max_api_calls))
            .bind(("max_storage_bytes", input.max_storage_bytes))
            .bind(("allowed_products", input.allowed_products))
            .bind(("features", features))
            .bind(("expires_at", input.expires_at))
            .bind(("is_trial", input.is_trial))
            .bind(("trial_ends_at", input.trial_ends_at))
            .bind(("max_machines", input.max_machines))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<LicenseRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "license".into(),
            id: id_str,
        })?;

        Ok(row.into_license(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> SentraResult<License> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('license', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LicenseRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "license".into(),
            id: id_str,
        })?;

        Ok(row.into_license(id)?)
    }

    async fn get_by_key(&self, key: &str) -> SentraResult<License> {
        let key_owned = key.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM license WHERE key = $key",
            )
            .bind(("key", key_owned))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LicenseRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "license".into(),
            id: "key=<redacted>".into(),
        })?;

        Ok(row.try_into_license()?)
    }

    async fn list_by_organization(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> SentraResult<PaginatedResult<License>> {
        let org_str = organization_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM license \
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
                "SELECT meta::id(id) AS record_id, * \
                 FROM license \
                 WHERE organization_id = $organization_id \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("organization_id", org_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LicenseRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_license())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn update_status(&self, id: Uuid, status: LicenseStatus) -> SentraResult<License> {
        let id_str = id.to_string();

        let result = self
            .db
            .query("UPDATE type::record('license', $id) SET status = $status")
            .bind(("id", id_str.clone()))
            .bind(("status", status.as_str()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<LicenseRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "license".into(),
            id: id_str,
        })?;

        Ok(row.into_license(id)?)
    }

    async fn touch_validated(&self, id: Uuid, at: DateTime<Utc>) -> SentraResult<()> {
        self.db
            .query("UPDATE type::record('license', $id) SET last_validated = $at")
            .bind(("id", id.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        Ok(())
    }

    async fn bind_machine(&self, id: Uuid, machine_hash: &str) -> SentraResult<MachineBind> {
        let id_str = id.to_string();
        let hash = machine_hash.to_string();

        // One conditional write: the capacity check and the append are
        // evaluated against the same row version, so concurrent binds
        // against the last free slot cannot both pass. RETURN BEFORE
        // exposes the pre-image to tell Bound from AlreadyBound.
        let mut result = self
            .db
            .query(
                "UPDATE type::record('license', $id) \
                 SET machine_ids = array::union(machine_ids, [$hash]) \
                 WHERE $hash IN machine_ids \
                    OR array::len(machine_ids) < max_machines \
                 RETURN BEFORE",
            )
            .bind(("id", id_str.clone()))
            .bind(("hash", hash.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MachineIdsRow> = result.take(0).map_err(DbError::from)?;

        match rows.into_iter().next() {
            Some(before) if before.machine_ids.iter().any(|h| h == &hash) => {
                Ok(MachineBind::AlreadyBound)
            }
            Some(_) => Ok(MachineBind::Bound),
            None => {
                // The condition failed: either the license is gone or
                // the set is full. Distinguish for the caller.
                self.get_by_id(id).await?;
                Ok(MachineBind::CapacityExceeded)
            }
        }
    }
}
