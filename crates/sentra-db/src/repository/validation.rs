//! SurrealDB implementation of [`ValidationLogRepository`].

use chrono::{DateTime, Utc};
use sentra_core::error::SentraResult;
use sentra_core::models::validation::{CreateLicenseValidation, LicenseValidation};
use sentra_core::repository::ValidationLogRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ValidationRow {
    license_id: Option<String>,
    is_valid: bool,
    reason: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    machine_id: Option<String>,
    product_id: Option<String>,
    validated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ValidationRowWithId {
    record_id: String,
    license_id: Option<String>,
    is_valid: bool,
    reason: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    machine_id: Option<String>,
    product_id: Option<String>,
    validated_at: DateTime<Utc>,
}

fn parse_license_id(raw: Option<String>) -> Result<Option<Uuid>, DbError> {
    raw.map(|s| {
        Uuid::parse_str(&s).map_err(|e| DbError::Corrupt(format!("invalid license UUID: {e}")))
    })
    .transpose()
}

impl ValidationRow {
    fn into_validation(self, id: Uuid) -> Result<LicenseValidation, DbError> {
        Ok(LicenseValidation {
            id,
            license_id: parse_license_id(self.license_id)?,
            is_valid: self.is_valid,
            reason: self.reason,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            machine_id: self.machine_id,
            product_id: self.product_id,
            validated_at: self.validated_at,
        })
    }
}

impl ValidationRowWithId {
    fn try_into_validation(self) -> Result<LicenseValidation, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        Ok(LicenseValidation {
            id,
            license_id: parse_license_id(self.license_id)?,
            is_valid: self.is_valid,
            reason: self.reason,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            machine_id: self.machine_id,
            product_id: self.product_id,
            validated_at: self.validated_at,
        })
    }
}

/// SurrealDB implementation of the validation audit trail.
pub struct SurrealValidationLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealValidationLogRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealValidationLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ValidationLogRepository for SurrealValidationLogRepository<C> {
    async fn append(&self, input: CreateLicenseValidation) -> SentraResult<LicenseValidation> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('license_validation', $id) SET \
                 license_id = $license_id, \
                 is_valid = $is_valid, \
                 reason = $reason, \
                 ip_address = $ip_address, \
                 user_agent = $user_agent, \
                 machine_id = $machine_id, \
                 product_id = $product_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("license_id", input.license_id.map(|u| u.to_string())))
            .bind(("is_valid", input.is_valid))
            .bind(("reason", input.reason))
            .bind(("ip_address", input.ip_address))
            .bind(("user_agent", input.user_agent))
            .bind(("machine_id", input.machine_id))
            .bind(("product_id", input.product_id))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<ValidationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "license_validation".into(),
            id: id_str,
        })?;

        Ok(row.into_validation(id)?)
    }

    async fn list_recent(
        &self,
        license_id: Option<Uuid>,
        limit: u64,
    ) -> SentraResult<Vec<LicenseValidation>> {
        // `None` selects the unknown-key sentinel rows.
        let query = match license_id {
            Some(_) => {
                "SELECT meta::id(id) AS record_id, * \
                 FROM license_validation \
                 WHERE license_id = $license_id \
                 ORDER BY validated_at DESC LIMIT $limit"
            }
            None => {
                "SELECT meta::id(id) AS record_id, * \
                 FROM license_validation \
                 WHERE license_id IS NONE \
                 ORDER BY validated_at DESC LIMIT $limit"
            }
        };

        let mut builder = self.db.query(query).bind(("limit", limit));
        if let Some(license_id) = license_id {
            builder = builder.bind(("license_id", license_id.to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<ValidationRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| row.try_into_validation())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
