//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Agent-facing repositories take
//! an `organization_id` parameter to enforce tenant isolation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SentraResult;
use crate::models::{
    agent::{Agent, AgentStatus, NewAgent, UpdateAgent},
    alert::{AgentAlert, CreateAgentAlert},
    api_key::{ApiKey, NewApiKey},
    command::{AgentCommand, CommandStatus, CreateAgentCommand},
    license::{License, LicenseStatus, NewLicense},
    metric::{AgentMetric, CreateAgentMetric},
    organization::{CreateOrganization, Organization},
    usage::{CreateUsageRecord, UsageRecord, UsageSummaryRow},
    validation::{CreateLicenseValidation, LicenseValidation},
    webhook::{NewWebhook, Webhook},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Outcome of a machine-bind attempt.
///
/// The bind must be atomic with the capacity check: two concurrent
/// binds against a license with one free slot may not both succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineBind {
    /// Hash appended; capacity held.
    Bound,
    /// Hash was already present; no mutation.
    AlreadyBound,
    /// Set is full and the hash is absent; no mutation.
    CapacityExceeded,
}

/// Query filters for agent metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricQuery {
    pub metric_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
}

/// Query filters for agent alerts.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub resolved: Option<bool>,
    pub severity: Option<crate::models::alert::AlertSeverity>,
    pub limit: Option<u64>,
}

// ---------------------------------------------------------------------------
// Organizations
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = SentraResult<Organization>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SentraResult<Organization>> + Send;
    fn get_by_domain(&self, domain: &str)
    -> impl Future<Output = SentraResult<Organization>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = SentraResult<PaginatedResult<Organization>>> + Send;
}

// ---------------------------------------------------------------------------
// Licenses
// ---------------------------------------------------------------------------

pub trait LicenseRepository: Send + Sync {
    fn create(&self, input: NewLicense) -> impl Future<Output = SentraResult<License>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SentraResult<License>> + Send;
    fn get_by_key(&self, key: &str) -> impl Future<Output = SentraResult<License>> + Send;
    fn list_by_organization(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = SentraResult<PaginatedResult<License>>> + Send;

    /// Set the license status. Operator- and engine-driven transitions
    /// both go through here; no state machine is enforced at this layer.
    fn update_status(
        &self,
        id: Uuid,
        status: LicenseStatus,
    ) -> impl Future<Output = SentraResult<License>> + Send;

    /// Record a successful validation timestamp.
    fn touch_validated(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = SentraResult<()>> + Send;

    /// Atomically add a machine hash to the license, honoring
    /// `max_machines`. Must be a single conditional write; see
    /// [`MachineBind`].
    fn bind_machine(
        &self,
        id: Uuid,
        machine_hash: &str,
    ) -> impl Future<Output = SentraResult<MachineBind>> + Send;
}

/// Append-only audit trail of validation attempts.
pub trait ValidationLogRepository: Send + Sync {
    fn append(
        &self,
        input: CreateLicenseValidation,
    ) -> impl Future<Output = SentraResult<LicenseValidation>> + Send;

    /// Most recent attempts for a license (`None` selects unknown-key
    /// attempts), newest first.
    fn list_recent(
        &self,
        license_id: Option<Uuid>,
        limit: u64,
    ) -> impl Future<Output = SentraResult<Vec<LicenseValidation>>> + Send;
}

// ---------------------------------------------------------------------------
// Usage metering
// ---------------------------------------------------------------------------

pub trait UsageRepository: Send + Sync {
    /// Append one event. No update or delete operations exist.
    fn append(
        &self,
        input: CreateUsageRecord,
    ) -> impl Future<Output = SentraResult<UsageRecord>> + Send;

    /// Aggregate quantities per `(product, event type)` for events
    /// recorded at or after `from`.
    fn summarize(
        &self,
        organization_id: Uuid,
        from: DateTime<Utc>,
    ) -> impl Future<Output = SentraResult<Vec<UsageSummaryRow>>> + Send;
}

// ---------------------------------------------------------------------------
// API keys
// ---------------------------------------------------------------------------

pub trait ApiKeyRepository: Send + Sync {
    fn create(&self, input: NewApiKey) -> impl Future<Output = SentraResult<ApiKey>> + Send;
    fn get_by_hash(&self, key_hash: &str) -> impl Future<Output = SentraResult<ApiKey>> + Send;

    /// Bump `usage_count` and stamp `last_used`.
    fn record_use(&self, id: Uuid) -> impl Future<Output = SentraResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Agents (organization-scoped)
// ---------------------------------------------------------------------------

pub trait AgentRepository: Send + Sync {
    fn create(&self, input: NewAgent) -> impl Future<Output = SentraResult<Agent>> + Send;
    fn get_by_id(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SentraResult<Agent>> + Send;
    fn get_by_hostname(
        &self,
        organization_id: Uuid,
        hostname: &str,
    ) -> impl Future<Output = SentraResult<Agent>> + Send;
    fn get_by_api_key(&self, api_key: &str) -> impl Future<Output = SentraResult<Agent>> + Send;
    fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: UpdateAgent,
    ) -> impl Future<Output = SentraResult<Agent>> + Send;
    fn delete(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SentraResult<()>> + Send;
    fn list(
        &self,
        organization_id: Uuid,
        status: Option<AgentStatus>,
        pagination: Pagination,
    ) -> impl Future<Output = SentraResult<PaginatedResult<Agent>>> + Send;

    /// Stamp `last_seen` and force status ACTIVE.
    fn touch_seen(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = SentraResult<()>> + Send;
}

/// Append-only metric store.
pub trait MetricRepository: Send + Sync {
    fn append(
        &self,
        input: CreateAgentMetric,
    ) -> impl Future<Output = SentraResult<AgentMetric>> + Send;
    fn list(
        &self,
        agent_id: Uuid,
        query: MetricQuery,
    ) -> impl Future<Output = SentraResult<Vec<AgentMetric>>> + Send;
}

pub trait AlertRepository: Send + Sync {
    fn create(
        &self,
        input: CreateAgentAlert,
    ) -> impl Future<Output = SentraResult<AgentAlert>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SentraResult<AgentAlert>> + Send;
    fn list(
        &self,
        agent_id: Uuid,
        filter: AlertFilter,
    ) -> impl Future<Output = SentraResult<Vec<AgentAlert>>> + Send;

    /// Transition an alert to resolved. The transition is terminal:
    /// resolving an already-resolved alert fails with a validation
    /// error and mutates nothing.
    fn resolve(
        &self,
        id: Uuid,
        resolved_by: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = SentraResult<AgentAlert>> + Send;
}

pub trait CommandRepository: Send + Sync {
    fn create(
        &self,
        input: CreateAgentCommand,
    ) -> impl Future<Output = SentraResult<AgentCommand>> + Send;
    fn list(
        &self,
        agent_id: Uuid,
        status: Option<CommandStatus>,
        limit: u64,
    ) -> impl Future<Output = SentraResult<Vec<AgentCommand>>> + Send;
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

pub trait WebhookRepository: Send + Sync {
    fn create(&self, input: NewWebhook) -> impl Future<Output = SentraResult<Webhook>> + Send;
    fn list(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = SentraResult<PaginatedResult<Webhook>>> + Send;
    fn delete(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SentraResult<()>> + Send;

    /// Active webhooks subscribed to an event type: the delivery-side
    /// interface boundary.
    fn get_by_event(
        &self,
        organization_id: Uuid,
        event_type: &str,
    ) -> impl Future<Output = SentraResult<Vec<Webhook>>> + Send;
}
