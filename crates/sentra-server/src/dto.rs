//! Wire-format response types.
//!
//! The JSON surface uses camelCase field names; domain models stay
//! snake_case internally. Credential material (`api_key`, hashes)
//! never crosses this boundary except where a contract explicitly
//! returns it once.

use chrono::{DateTime, Utc};
use sentra_core::models::agent::{Agent, AgentStatus};
use sentra_core::models::alert::{AgentAlert, AlertSeverity};
use sentra_core::models::command::{AgentCommand, CommandStatus};
use sentra_core::models::license::{FeatureSet, License, LicenseStatus, LicenseTier};
use sentra_core::models::organization::Organization;
use sentra_core::models::usage::UsageSummaryRow;
use sentra_core::models::validation::LicenseValidation;
use sentra_core::models::webhook::Webhook;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationResponse {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub contact_email: String,
    pub created_at: DateTime<Utc>,
}

impl From<Organization> for OrganizationResponse {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id,
            name: org.name,
            domain: org.domain,
            contact_email: org.contact_email,
            created_at: org.created_at,
        }
    }
}

/// Compact license view for list endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseSummary {
    pub id: Uuid,
    pub license_key: String,
    pub tier: LicenseTier,
    pub status: LicenseStatus,
    pub max_users: u64,
    pub max_products: u64,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_trial: bool,
    pub last_validated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<License> for LicenseSummary {
    fn from(license: License) -> Self {
        Self {
            id: license.id,
            license_key: license.key,
            tier: license.tier,
            status: license.status,
            max_users: license.max_users,
            max_products: license.max_products,
            expires_at: license.expires_at,
            is_trial: license.is_trial,
            last_validated: license.last_validated,
            created_at: license.created_at,
        }
    }
}

/// Full license view for detail endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseDetail {
    pub id: Uuid,
    pub license_key: String,
    pub organization_id: Uuid,
    pub tier: LicenseTier,
    pub status: LicenseStatus,
    pub max_users: u64,
    pub max_products: u64,
    pub max_api_calls: u64,
    pub max_storage_bytes: u64,
    pub allowed_products: Vec<String>,
    pub features: FeatureSet,
    pub start_date: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_trial: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub machine_ids: Vec<String>,
    pub max_machines: u64,
    pub last_validated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<License> for LicenseDetail {
    fn from(license: License) -> Self {
        Self {
            id: license.id,
            license_key: license.key,
            organization_id: license.organization_id,
            tier: license.tier,
            status: license.status,
            max_users: license.max_users,
            max_products: license.max_products,
            max_api_calls: license.max_api_calls,
            max_storage_bytes: license.max_storage_bytes,
            allowed_products: license.allowed_products,
            features: license.features,
            start_date: license.start_date,
            expires_at: license.expires_at,
            is_trial: license.is_trial,
            trial_ends_at: license.trial_ends_at,
            machine_ids: license.machine_ids,
            max_machines: license.max_machines,
            last_validated: license.last_validated,
            created_at: license.created_at,
        }
    }
}

/// One audit-trail entry, as embedded in license detail responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationEntry {
    pub is_valid: bool,
    pub reason: Option<String>,
    pub ip_address: Option<String>,
    pub machine_id: Option<String>,
    pub product_id: Option<String>,
    pub validated_at: DateTime<Utc>,
}

impl From<LicenseValidation> for ValidationEntry {
    fn from(v: LicenseValidation) -> Self {
        Self {
            is_valid: v.is_valid,
            reason: v.reason,
            ip_address: v.ip_address,
            machine_id: v.machine_id,
            product_id: v.product_id,
            validated_at: v.validated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub id: Uuid,
    pub hostname: String,
    pub ip_address: Option<String>,
    pub os_type: String,
    pub os_version: Option<String>,
    pub agent_version: String,
    pub status: AgentStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub config: Value,
    pub license_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Agent> for AgentResponse {
    fn from(agent: Agent) -> Self {
        Self {
            id: agent.id,
            hostname: agent.hostname,
            ip_address: agent.ip_address,
            os_type: agent.os_type,
            os_version: agent.os_version,
            agent_version: agent.agent_version,
            status: agent.status,
            last_seen: agent.last_seen,
            config: Value::Object(agent.config.into_iter().collect()),
            license_id: agent.license_id,
            created_at: agent.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    pub id: Uuid,
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub details: Value,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<AgentAlert> for AlertResponse {
    fn from(alert: AgentAlert) -> Self {
        Self {
            id: alert.id,
            alert_type: alert.alert_type,
            severity: alert.severity,
            message: alert.message,
            details: alert.details,
            resolved: alert.resolved,
            resolved_at: alert.resolved_at,
            resolved_by: alert.resolved_by,
            created_at: alert.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub id: Uuid,
    pub command_type: String,
    pub command_data: Value,
    pub status: CommandStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<AgentCommand> for CommandResponse {
    fn from(command: AgentCommand) -> Self {
        Self {
            id: command.id,
            command_type: command.command_type,
            command_data: command.command_data,
            status: command.status,
            created_by: command.created_by,
            created_at: command.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub id: Uuid,
    pub url: String,
    pub events: Vec<String>,
    pub is_active: bool,
    pub last_triggered: Option<DateTime<Utc>>,
    pub success_count: u64,
    pub failure_count: u64,
    pub created_at: DateTime<Utc>,
}

impl From<Webhook> for WebhookResponse {
    fn from(webhook: Webhook) -> Self {
        Self {
            id: webhook.id,
            url: webhook.url,
            events: webhook.events,
            is_active: webhook.is_active,
            last_triggered: webhook.last_triggered,
            success_count: webhook.success_count,
            failure_count: webhook.failure_count,
            created_at: webhook.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummaryEntry {
    pub product_id: String,
    pub event_type: String,
    pub total_quantity: u64,
}

impl From<UsageSummaryRow> for UsageSummaryEntry {
    fn from(row: UsageSummaryRow) -> Self {
        Self {
            product_id: row.product_id,
            event_type: row.event_type,
            total_quantity: row.total_quantity,
        }
    }
}
