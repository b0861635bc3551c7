//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizations (tenancy root)
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD domain ON TABLE organization TYPE string;
DEFINE FIELD contact_email ON TABLE organization TYPE string;
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_domain ON TABLE organization \
    COLUMNS domain UNIQUE;

-- =======================================================================
-- Licenses (organization scope)
-- =======================================================================
DEFINE TABLE license SCHEMAFULL;
DEFINE FIELD key ON TABLE license TYPE string;
DEFINE FIELD organization_id ON TABLE license TYPE string;
DEFINE FIELD tier ON TABLE license TYPE string \
    ASSERT $value IN ['TRIAL', 'STARTER', 'PROFESSIONAL', \
    'ENTERPRISE', 'UNLIMITED'];
DEFINE FIELD status ON TABLE license TYPE string \
    ASSERT $value IN ['ACTIVE', 'SUSPENDED', 'EXPIRED', 'CANCELLED'];
DEFINE FIELD max_users ON TABLE license TYPE int;
DEFINE FIELD max_products ON TABLE license TYPE int;
DEFINE FIELD max_api_calls ON TABLE license TYPE int;
DEFINE FIELD max_storage_bytes ON TABLE license TYPE int;
DEFINE FIELD allowed_products ON TABLE license TYPE array<string> \
    DEFAULT [];
DEFINE FIELD features ON TABLE license TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD start_date ON TABLE license TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD expires_at ON TABLE license TYPE option<datetime>;
DEFINE FIELD is_trial ON TABLE license TYPE bool DEFAULT false;
DEFINE FIELD trial_ends_at ON TABLE license TYPE option<datetime>;
DEFINE FIELD machine_ids ON TABLE license TYPE array<string> DEFAULT [];
DEFINE FIELD max_machines ON TABLE license TYPE int;
DEFINE FIELD last_validated ON TABLE license TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE license TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_license_key ON TABLE license COLUMNS key UNIQUE;
DEFINE INDEX idx_license_org ON TABLE license COLUMNS organization_id;

-- =======================================================================
-- License validations (append-only audit trail)
-- =======================================================================
DEFINE TABLE license_validation SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD license_id ON TABLE license_validation TYPE option<string>;
DEFINE FIELD is_valid ON TABLE license_validation TYPE bool;
DEFINE FIELD reason ON TABLE license_validation TYPE option<string>;
DEFINE FIELD ip_address ON TABLE license_validation TYPE option<string>;
DEFINE FIELD user_agent ON TABLE license_validation TYPE option<string>;
DEFINE FIELD machine_id ON TABLE license_validation TYPE option<string>;
DEFINE FIELD product_id ON TABLE license_validation TYPE option<string>;
DEFINE FIELD validated_at ON TABLE license_validation TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_validation_license ON TABLE license_validation \
    COLUMNS license_id, validated_at;

-- =======================================================================
-- Usage records (append-only metering ledger)
-- =======================================================================
DEFINE TABLE usage_record SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD organization_id ON TABLE usage_record TYPE string;
DEFINE FIELD license_id ON TABLE usage_record TYPE option<string>;
DEFINE FIELD product_id ON TABLE usage_record TYPE string;
DEFINE FIELD event_type ON TABLE usage_record TYPE string;
DEFINE FIELD quantity ON TABLE usage_record TYPE int;
DEFINE FIELD metadata ON TABLE usage_record TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD recorded_at ON TABLE usage_record TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_usage_org_time ON TABLE usage_record \
    COLUMNS organization_id, recorded_at;

-- =======================================================================
-- API keys (organization scope)
-- =======================================================================
DEFINE TABLE api_key SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE api_key TYPE string;
DEFINE FIELD name ON TABLE api_key TYPE string;
DEFINE FIELD key_hash ON TABLE api_key TYPE string;
DEFINE FIELD scopes ON TABLE api_key TYPE array<string> DEFAULT [];
DEFINE FIELD is_active ON TABLE api_key TYPE bool DEFAULT true;
DEFINE FIELD expires_at ON TABLE api_key TYPE option<datetime>;
DEFINE FIELD last_used ON TABLE api_key TYPE option<datetime>;
DEFINE FIELD usage_count ON TABLE api_key TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE api_key TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_api_key_hash ON TABLE api_key COLUMNS key_hash UNIQUE;

-- =======================================================================
-- Agents (organization scope, unique per hostname)
-- =======================================================================
DEFINE TABLE agent SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE agent TYPE string;
DEFINE FIELD hostname ON TABLE agent TYPE string;
DEFINE FIELD ip_address ON TABLE agent TYPE option<string>;
DEFINE FIELD os_type ON TABLE agent TYPE string;
DEFINE FIELD os_version ON TABLE agent TYPE option<string>;
DEFINE FIELD agent_version ON TABLE agent TYPE string;
DEFINE FIELD api_key ON TABLE agent TYPE string;
DEFINE FIELD status ON TABLE agent TYPE string \
    ASSERT $value IN ['ACTIVE', 'INACTIVE', 'ERROR'];
DEFINE FIELD last_seen ON TABLE agent TYPE option<datetime>;
DEFINE FIELD config ON TABLE agent TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD license_id ON TABLE agent TYPE option<string>;
DEFINE FIELD created_at ON TABLE agent TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE agent TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_agent_org_hostname ON TABLE agent \
    COLUMNS organization_id, hostname UNIQUE;
DEFINE INDEX idx_agent_api_key ON TABLE agent COLUMNS api_key UNIQUE;

-- =======================================================================
-- Agent metrics (append-only)
-- =======================================================================
DEFINE TABLE agent_metric SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD agent_id ON TABLE agent_metric TYPE string;
DEFINE FIELD metric_type ON TABLE agent_metric TYPE string;
DEFINE FIELD metric_data ON TABLE agent_metric TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD timestamp ON TABLE agent_metric TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_metric_agent_time ON TABLE agent_metric \
    COLUMNS agent_id, timestamp;

-- =======================================================================
-- Agent alerts
-- =======================================================================
DEFINE TABLE agent_alert SCHEMAFULL;
DEFINE FIELD agent_id ON TABLE agent_alert TYPE string;
DEFINE FIELD alert_type ON TABLE agent_alert TYPE string;
DEFINE FIELD severity ON TABLE agent_alert TYPE string \
    ASSERT $value IN ['WARNING', 'ERROR', 'CRITICAL'];
DEFINE FIELD message ON TABLE agent_alert TYPE string;
DEFINE FIELD details ON TABLE agent_alert TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD resolved ON TABLE agent_alert TYPE bool DEFAULT false;
DEFINE FIELD resolved_at ON TABLE agent_alert TYPE option<datetime>;
DEFINE FIELD resolved_by ON TABLE agent_alert TYPE option<string>;
DEFINE FIELD created_at ON TABLE agent_alert TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_alert_agent_time ON TABLE agent_alert \
    COLUMNS agent_id, created_at;

-- =======================================================================
-- Agent commands
-- =======================================================================
DEFINE TABLE agent_command SCHEMAFULL;
DEFINE FIELD agent_id ON TABLE agent_command TYPE string;
DEFINE FIELD command_type ON TABLE agent_command TYPE string;
DEFINE FIELD command_data ON TABLE agent_command TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD status ON TABLE agent_command TYPE string \
    ASSERT $value IN ['PENDING', 'ACKED', 'RUNNING', 'COMPLETED', \
    'FAILED'];
DEFINE FIELD created_by ON TABLE agent_command TYPE string;
DEFINE FIELD created_at ON TABLE agent_command TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_command_agent_time ON TABLE agent_command \
    COLUMNS agent_id, created_at;

-- =======================================================================
-- Webhooks (organization scope, registry only)
-- =======================================================================
DEFINE TABLE webhook SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE webhook TYPE string;
DEFINE FIELD url ON TABLE webhook TYPE string;
DEFINE FIELD events ON TABLE webhook TYPE array<string> DEFAULT [];
DEFINE FIELD secret_hash ON TABLE webhook TYPE string;
DEFINE FIELD is_active ON TABLE webhook TYPE bool DEFAULT true;
DEFINE FIELD last_triggered ON TABLE webhook TYPE option<datetime>;
DEFINE FIELD success_count ON TABLE webhook TYPE int DEFAULT 0;
DEFINE FIELD failure_count ON TABLE webhook TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE webhook TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_webhook_org ON TABLE webhook COLUMNS organization_id;
";

/// Apply any outstanding migrations.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
