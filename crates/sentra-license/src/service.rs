//! License service — issuance, validation, and usage metering.

use chrono::{DateTime, Duration, Utc};
use sentra_core::error::{SentraError, SentraResult};
use sentra_core::models::license::{
    FeatureSet, License, LicenseStatus, LicenseTier, NewLicense,
};
use sentra_core::models::usage::{CreateUsageRecord, UsageSummaryRow};
use sentra_core::models::validation::CreateLicenseValidation;
use sentra_core::repository::{
    LicenseRepository, MachineBind, OrganizationRepository, UsageRepository,
    ValidationLogRepository,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::entitlements;
use crate::keygen;

/// Trial length applied when a trial license is created without an
/// explicit end date.
const TRIAL_DAYS: i64 = 30;

/// Machines a license may bind when no override is supplied.
const DEFAULT_MAX_MACHINES: u64 = 5;

/// Input for one validation attempt.
#[derive(Debug, Clone)]
pub struct ValidateInput {
    pub license_key: String,
    pub product_id: Option<String>,
    pub machine_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// The frozen entitlements returned to a successfully validated caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementSnapshot {
    pub tier: LicenseTier,
    pub organization: String,
    pub max_users: u64,
    pub max_products: u64,
    pub max_api_calls: u64,
    pub max_storage_bytes: u64,
    pub allowed_products: Vec<String>,
    pub features: FeatureSet,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_trial: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
}

/// Business outcome of a validation attempt. Denials are values, not
/// errors; only operational failures (datastore, etc.) surface as
/// `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<EntitlementSnapshot>,
}

impl ValidationOutcome {
    fn denied(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
            license: None,
        }
    }
}

/// Input for license creation (administrative boundary).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLicenseInput {
    pub organization_id: Uuid,
    pub tier: LicenseTier,
    pub max_users: Option<u64>,
    pub max_products: Option<u64>,
    pub max_machines: Option<u64>,
    pub allowed_products: Option<Vec<String>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_trial: Option<bool>,
}

/// Reporting window for usage summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryPeriod {
    Day,
    Week,
    Month,
}

impl SummaryPeriod {
    /// Start of the window, counted back from `now`.
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            SummaryPeriod::Day => now - Duration::days(1),
            SummaryPeriod::Week => now - Duration::days(7),
            SummaryPeriod::Month => now - Duration::days(30),
        }
    }
}

/// License service.
///
/// Generic over repository implementations so the engine has no
/// dependency on the database crate.
pub struct LicenseService<L, V, U, O>
where
    L: LicenseRepository,
    V: ValidationLogRepository,
    U: UsageRepository,
    O: OrganizationRepository,
{
    licenses: L,
    validations: V,
    usage: U,
    organizations: O,
}

impl<L, V, U, O> LicenseService<L, V, U, O>
where
    L: LicenseRepository,
    V: ValidationLogRepository,
    U: UsageRepository,
    O: OrganizationRepository,
{
    pub fn new(licenses: L, validations: V, usage: U, organizations: O) -> Self {
        Self {
            licenses,
            validations,
            usage,
            organizations,
        }
    }

    /// Create a license for an organization, snapshotting tier defaults.
    ///
    /// The tier table is consulted here and never again for this
    /// license: later edits to the defaults do not propagate.
    pub async fn create_license(&self, input: CreateLicenseInput) -> SentraResult<License> {
        // The organization must exist; this is an operational error,
        // not a business outcome.
        let organization = self.organizations.get_by_id(input.organization_id).await?;

        let defaults = entitlements::defaults_for(input.tier);
        let key = keygen::generate_license_key();
        let is_trial = input.is_trial.unwrap_or(false);
        let trial_ends_at = is_trial.then(|| Utc::now() + Duration::days(TRIAL_DAYS));

        let license = self
            .licenses
            .create(NewLicense {
                key,
                organization_id: organization.id,
                tier: input.tier,
                max_users: input.max_users.unwrap_or(defaults.max_users),
                max_products: input.max_products.unwrap_or(defaults.max_products),
                max_api_calls: defaults.max_api_calls,
                max_storage_bytes: defaults.max_storage_bytes,
                allowed_products: input.allowed_products.unwrap_or_default(),
                features: defaults.features,
                expires_at: input.expires_at,
                is_trial,
                trial_ends_at,
                max_machines: input.max_machines.unwrap_or(DEFAULT_MAX_MACHINES),
            })
            .await?;

        info!(
            license_id = %license.id,
            organization_id = %organization.id,
            tier = license.tier.as_str(),
            "license created"
        );

        Ok(license)
    }

    /// Operator-driven status transition. No state machine is applied:
    /// an operator may move a license out of a terminal state.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: LicenseStatus,
    ) -> SentraResult<License> {
        let license = self.licenses.update_status(id, status).await?;
        info!(license_id = %id, status = status.as_str(), "license status updated");
        Ok(license)
    }

    /// Validate a license key against an optional product and machine.
    ///
    /// Every attempt, success or failure, known key or not, appends
    /// an audit row before this returns. Business denials come back as
    /// `Ok(ValidationOutcome { valid: false, .. })`; only operational
    /// failures are `Err`.
    pub async fn validate(&self, input: ValidateInput) -> SentraResult<ValidationOutcome> {
        // 1. Malformed keys are indistinguishable from unknown ones.
        if !keygen::is_well_formed_key(&input.license_key) {
            return self.deny_unknown(&input).await;
        }

        let license = match self.licenses.get_by_key(&input.license_key).await {
            Ok(license) => license,
            Err(SentraError::NotFound { .. }) => return self.deny_unknown(&input).await,
            Err(e) => return Err(e),
        };

        // 2. Status gate.
        if license.status != LicenseStatus::Active {
            let reason = format!("License is {}", license.status.as_str().to_lowercase());
            return self.deny(&license, &input, reason).await;
        }

        let now = Utc::now();

        // 3. Hard expiry. The transition is lazy: it happens only when
        //    a validation observes the expired condition.
        if license.expires_at.is_some_and(|t| t < now) {
            self.licenses
                .update_status(license.id, LicenseStatus::Expired)
                .await?;
            return self.deny(&license, &input, "License expired").await;
        }

        // 4. Trial expiry, same lazy transition.
        if license.is_trial && license.trial_ends_at.is_some_and(|t| t < now) {
            self.licenses
                .update_status(license.id, LicenseStatus::Expired)
                .await?;
            return self.deny(&license, &input, "Trial period expired").await;
        }

        // 5. Product entitlement. UNLIMITED and ENTERPRISE cover every
        //    product; everyone else needs an explicit grant.
        if let Some(product_id) = &input.product_id {
            let entitled = matches!(
                license.tier,
                LicenseTier::Unlimited | LicenseTier::Enterprise
            ) || license.allowed_products.iter().any(|p| p == product_id);

            if !entitled {
                return self
                    .deny(&license, &input, "Product not included in license")
                    .await;
            }
        }

        // 6. Machine binding. The hash-and-bind is a single conditional
        //    write in the repository, so concurrent callers cannot
        //    overshoot `max_machines`.
        if let Some(machine_id) = &input.machine_id {
            let hash = keygen::hash_machine_id(machine_id);
            match self.licenses.bind_machine(license.id, &hash).await? {
                MachineBind::Bound | MachineBind::AlreadyBound => {}
                MachineBind::CapacityExceeded => {
                    return self
                        .deny(&license, &input, "Maximum number of machines exceeded")
                        .await;
                }
            }
        }

        // 7. Success: audit first, then stamp and meter.
        self.validations
            .append(CreateLicenseValidation {
                license_id: Some(license.id),
                is_valid: true,
                reason: None,
                ip_address: input.ip_address.clone(),
                user_agent: input.user_agent.clone(),
                machine_id: input.machine_id.clone(),
                product_id: input.product_id.clone(),
            })
            .await?;

        self.licenses.touch_validated(license.id, now).await?;

        if let Some(product_id) = &input.product_id {
            self.usage
                .append(CreateUsageRecord {
                    organization_id: license.organization_id,
                    license_id: Some(license.id),
                    product_id: product_id.clone(),
                    event_type: "license_validation".into(),
                    quantity: 1,
                    metadata: Default::default(),
                })
                .await?;
        }

        let organization = self.organizations.get_by_id(license.organization_id).await?;

        Ok(ValidationOutcome {
            valid: true,
            reason: None,
            license: Some(EntitlementSnapshot {
                tier: license.tier,
                organization: organization.name,
                max_users: license.max_users,
                max_products: license.max_products,
                max_api_calls: license.max_api_calls,
                max_storage_bytes: license.max_storage_bytes,
                allowed_products: license.allowed_products,
                features: license.features,
                expires_at: license.expires_at,
                is_trial: license.is_trial,
                trial_ends_at: license.trial_ends_at,
            }),
        })
    }

    /// Append a metered usage event.
    pub async fn record_usage(&self, input: CreateUsageRecord) -> SentraResult<()> {
        self.usage.append(input).await?;
        Ok(())
    }

    /// Aggregate usage per `(product, event type)` over a window.
    pub async fn usage_summary(
        &self,
        organization_id: Uuid,
        period: SummaryPeriod,
    ) -> SentraResult<Vec<UsageSummaryRow>> {
        self.usage
            .summarize(organization_id, period.start(Utc::now()))
            .await
    }

    /// Unknown or malformed key: audit with the sentinel (no license
    /// reference) and deny.
    async fn deny_unknown(&self, input: &ValidateInput) -> SentraResult<ValidationOutcome> {
        self.validations
            .append(CreateLicenseValidation {
                license_id: None,
                is_valid: false,
                reason: Some("License key not found".into()),
                ip_address: input.ip_address.clone(),
                user_agent: input.user_agent.clone(),
                machine_id: input.machine_id.clone(),
                product_id: input.product_id.clone(),
            })
            .await?;

        Ok(ValidationOutcome::denied("Invalid license key"))
    }

    /// Known license, denied: audit with the failure reason and deny.
    async fn deny(
        &self,
        license: &License,
        input: &ValidateInput,
        reason: impl Into<String>,
    ) -> SentraResult<ValidationOutcome> {
        let reason = reason.into();

        self.validations
            .append(CreateLicenseValidation {
                license_id: Some(license.id),
                is_valid: false,
                reason: Some(reason.clone()),
                ip_address: input.ip_address.clone(),
                user_agent: input.user_agent.clone(),
                machine_id: input.machine_id.clone(),
                product_id: input.product_id.clone(),
            })
            .await?;

        Ok(ValidationOutcome::denied(reason))
    }
}
