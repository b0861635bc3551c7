//! Integration tests for the validation engine against in-memory
//! SurrealDB.

use chrono::{Duration, Utc};
use sentra_core::models::license::{FeatureSet, LicenseStatus, LicenseTier, NewLicense};
use sentra_core::models::organization::CreateOrganization;
use sentra_core::repository::{
    LicenseRepository, OrganizationRepository, UsageRepository, ValidationLogRepository,
};
use sentra_db::repository::{
    SurrealLicenseRepository, SurrealOrganizationRepository, SurrealUsageRepository,
    SurrealValidationLogRepository,
};
use sentra_license::keygen;
use sentra_license::service::{CreateLicenseInput, LicenseService, ValidateInput};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;
type Service = LicenseService<
    SurrealLicenseRepository<Db>,
    SurrealValidationLogRepository<Db>,
    SurrealUsageRepository<Db>,
    SurrealOrganizationRepository<Db>,
>;

/// Spin up in-memory DB, run migrations, create an organization, and
/// build the service.
async fn setup() -> (Service, Uuid, Surreal<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    sentra_db::run_migrations(&db).await.unwrap();

    let org_repo = SurrealOrganizationRepository::new(db.clone());
    let org = org_repo
        .create(CreateOrganization {
            name: "ACME Corp".into(),
            domain: "acme.example".into(),
            contact_email: "ops@acme.example".into(),
        })
        .await
        .unwrap();

    let service = LicenseService::new(
        SurrealLicenseRepository::new(db.clone()),
        SurrealValidationLogRepository::new(db.clone()),
        SurrealUsageRepository::new(db.clone()),
        org_repo,
    );

    (service, org.id, db)
}

fn validate_key(key: &str) -> ValidateInput {
    ValidateInput {
        license_key: key.into(),
        product_id: None,
        machine_id: None,
        ip_address: Some("127.0.0.1".into()),
        user_agent: Some("TestAgent".into()),
    }
}

fn create_input(organization_id: Uuid, tier: LicenseTier) -> CreateLicenseInput {
    CreateLicenseInput {
        organization_id,
        tier,
        max_users: None,
        max_products: None,
        max_machines: None,
        allowed_products: None,
        expires_at: None,
        is_trial: None,
    }
}

// -----------------------------------------------------------------------
// Creation
// -----------------------------------------------------------------------

#[tokio::test]
async fn enterprise_creation_snapshots_defaults() {
    let (service, org_id, _db) = setup().await;

    let license = service
        .create_license(CreateLicenseInput {
            allowed_products: Some(vec!["prod-a".into()]),
            ..create_input(org_id, LicenseTier::Enterprise)
        })
        .await
        .unwrap();

    assert_eq!(license.max_users, 1000);
    assert_eq!(license.allowed_products, vec!["prod-a".to_string()]);
    assert_eq!(license.status, LicenseStatus::Active);
    assert!(!license.is_trial);
    assert!(license.features.dedicated_support);
    assert!(keygen::is_well_formed_key(&license.key));
}

#[tokio::test]
async fn creation_rejects_unknown_organization() {
    let (service, _org_id, _db) = setup().await;

    let result = service
        .create_license(create_input(Uuid::new_v4(), LicenseTier::Starter))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn trial_creation_sets_trial_end() {
    let (service, org_id, _db) = setup().await;

    let license = service
        .create_license(CreateLicenseInput {
            is_trial: Some(true),
            ..create_input(org_id, LicenseTier::Trial)
        })
        .await
        .unwrap();

    assert!(license.is_trial);
    let trial_ends_at = license.trial_ends_at.expect("trial end set");
    let expected = Utc::now() + Duration::days(30);
    assert!((trial_ends_at - expected).num_minutes().abs() < 5);
}

/// The entitlement snapshot is frozen at creation: overrides stick,
/// and validation reads the stored row rather than the defaults table.
#[tokio::test]
async fn snapshot_is_frozen_at_creation() {
    let (service, org_id, _db) = setup().await;

    let license = service
        .create_license(CreateLicenseInput {
            max_users: Some(7),
            ..create_input(org_id, LicenseTier::Starter)
        })
        .await
        .unwrap();
    assert_eq!(license.max_users, 7);

    let outcome = service.validate(validate_key(&license.key)).await.unwrap();
    assert!(outcome.valid);
    // Not the STARTER default of 25; the stored snapshot wins.
    assert_eq!(outcome.license.unwrap().max_users, 7);
}

// -----------------------------------------------------------------------
// Decision chain
// -----------------------------------------------------------------------

#[tokio::test]
async fn unknown_key_is_denied_and_audited_once() {
    let (service, _org_id, db) = setup().await;

    let outcome = service
        .validate(validate_key("ZZZZ-ZZZZ-ZZZZ-ZZZZ-ZZZZ"))
        .await
        .unwrap();

    assert!(!outcome.valid);
    assert_eq!(outcome.reason.as_deref(), Some("Invalid license key"));
    assert!(outcome.license.is_none());

    let log = SurrealValidationLogRepository::new(db);
    let unknown = log.list_recent(None, 10).await.unwrap();
    assert_eq!(unknown.len(), 1, "exactly one audit row");
    assert!(!unknown[0].is_valid);
    assert!(unknown[0].license_id.is_none());
}

#[tokio::test]
async fn malformed_key_is_treated_as_unknown() {
    let (service, _org_id, db) = setup().await;

    let outcome = service
        .validate(validate_key("not-a-license-key"))
        .await
        .unwrap();

    assert!(!outcome.valid);
    assert_eq!(outcome.reason.as_deref(), Some("Invalid license key"));

    let log = SurrealValidationLogRepository::new(db);
    assert_eq!(log.list_recent(None, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn suspended_license_is_denied_with_status_reason() {
    let (service, org_id, _db) = setup().await;

    let license = service
        .create_license(create_input(org_id, LicenseTier::Professional))
        .await
        .unwrap();
    service
        .update_status(license.id, LicenseStatus::Suspended)
        .await
        .unwrap();

    let outcome = service.validate(validate_key(&license.key)).await.unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.reason.as_deref(), Some("License is suspended"));
}

#[tokio::test]
async fn hard_expiry_is_lazy() {
    let (service, org_id, db) = setup().await;
    let licenses = SurrealLicenseRepository::new(db);

    // Insert directly so the expiry can sit in the past.
    let license = licenses
        .create(NewLicense {
            key: keygen::generate_license_key(),
            organization_id: org_id,
            tier: LicenseTier::Starter,
            max_users: 25,
            max_products: 5,
            max_api_calls: 10_000,
            max_storage_bytes: 1,
            allowed_products: vec![],
            features: FeatureSet::default(),
            expires_at: Some(Utc::now() - Duration::days(1)),
            is_trial: false,
            trial_ends_at: None,
            max_machines: 5,
        })
        .await
        .unwrap();

    // Stored status is still ACTIVE until a validation observes the
    // expiry.
    assert_eq!(license.status, LicenseStatus::Active);

    let outcome = service.validate(validate_key(&license.key)).await.unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.reason.as_deref(), Some("License expired"));

    let stored = licenses.get_by_id(license.id).await.unwrap();
    assert_eq!(stored.status, LicenseStatus::Expired);
}

#[tokio::test]
async fn trial_expiry_is_lazy_and_flips_status() {
    let (service, org_id, db) = setup().await;
    let licenses = SurrealLicenseRepository::new(db);

    let license = licenses
        .create(NewLicense {
            key: keygen::generate_license_key(),
            organization_id: org_id,
            tier: LicenseTier::Trial,
            max_users: 5,
            max_products: 3,
            max_api_calls: 1_000,
            max_storage_bytes: 1,
            allowed_products: vec![],
            features: FeatureSet::default(),
            expires_at: None,
            is_trial: true,
            trial_ends_at: Some(Utc::now() - Duration::hours(1)),
            max_machines: 5,
        })
        .await
        .unwrap();
    assert_eq!(license.status, LicenseStatus::Active);

    let outcome = service.validate(validate_key(&license.key)).await.unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.reason.as_deref(), Some("Trial period expired"));

    let stored = licenses.get_by_id(license.id).await.unwrap();
    assert_eq!(stored.status, LicenseStatus::Expired);

    // The next validation sees the terminal state, not the trial rule.
    let outcome = service.validate(validate_key(&license.key)).await.unwrap();
    assert_eq!(outcome.reason.as_deref(), Some("License is expired"));
}

#[tokio::test]
async fn product_entitlement_by_grant_or_high_tier() {
    let (service, org_id, _db) = setup().await;

    let starter = service
        .create_license(CreateLicenseInput {
            allowed_products: Some(vec!["prod-a".into()]),
            ..create_input(org_id, LicenseTier::Starter)
        })
        .await
        .unwrap();

    let mut input = validate_key(&starter.key);
    input.product_id = Some("prod-a".into());
    assert!(service.validate(input).await.unwrap().valid);

    let mut input = validate_key(&starter.key);
    input.product_id = Some("prod-b".into());
    let outcome = service.validate(input).await.unwrap();
    assert!(!outcome.valid);
    assert_eq!(
        outcome.reason.as_deref(),
        Some("Product not included in license")
    );

    // ENTERPRISE covers every product without an explicit grant.
    let enterprise = service
        .create_license(create_input(org_id, LicenseTier::Enterprise))
        .await
        .unwrap();
    let mut input = validate_key(&enterprise.key);
    input.product_id = Some("prod-b".into());
    assert!(service.validate(input).await.unwrap().valid);
}

// -----------------------------------------------------------------------
// Machine binding
// -----------------------------------------------------------------------

#[tokio::test]
async fn machine_binding_hashes_and_is_idempotent() {
    let (service, org_id, db) = setup().await;
    let licenses = SurrealLicenseRepository::new(db);

    let license = service
        .create_license(CreateLicenseInput {
            max_machines: Some(2),
            ..create_input(org_id, LicenseTier::Professional)
        })
        .await
        .unwrap();

    let mut input = validate_key(&license.key);
    input.machine_id = Some("machine-alpha".into());
    assert!(service.validate(input.clone()).await.unwrap().valid);

    // Re-validating from the same machine never grows the set.
    assert!(service.validate(input).await.unwrap().valid);

    let stored = licenses.get_by_id(license.id).await.unwrap();
    assert_eq!(stored.machine_ids.len(), 1);
    // Raw identifiers are never persisted.
    assert_eq!(
        stored.machine_ids[0],
        keygen::hash_machine_id("machine-alpha")
    );
    assert!(!stored.machine_ids[0].contains("machine-alpha"));
}

#[tokio::test]
async fn machine_capacity_denies_and_audits() {
    let (service, org_id, db) = setup().await;

    let license = service
        .create_license(CreateLicenseInput {
            max_machines: Some(1),
            ..create_input(org_id, LicenseTier::Starter)
        })
        .await
        .unwrap();

    let mut first = validate_key(&license.key);
    first.machine_id = Some("machine-alpha".into());
    assert!(service.validate(first).await.unwrap().valid);

    let mut second = validate_key(&license.key);
    second.machine_id = Some("machine-beta".into());
    let outcome = service.validate(second).await.unwrap();
    assert!(!outcome.valid);
    assert_eq!(
        outcome.reason.as_deref(),
        Some("Maximum number of machines exceeded")
    );

    let log = SurrealValidationLogRepository::new(db.clone());
    let entries = log.list_recent(Some(license.id), 10).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|e| !e.is_valid));

    let stored = SurrealLicenseRepository::new(db)
        .get_by_id(license.id)
        .await
        .unwrap();
    assert!(stored.machine_ids.len() as u64 <= stored.max_machines);
}

// -----------------------------------------------------------------------
// Success side effects
// -----------------------------------------------------------------------

#[tokio::test]
async fn success_stamps_last_validated_and_meters_usage() {
    let (service, org_id, db) = setup().await;

    let license = service
        .create_license(CreateLicenseInput {
            allowed_products: Some(vec!["prod-a".into()]),
            ..create_input(org_id, LicenseTier::Starter)
        })
        .await
        .unwrap();
    assert!(license.last_validated.is_none());

    let mut input = validate_key(&license.key);
    input.product_id = Some("prod-a".into());
    let outcome = service.validate(input).await.unwrap();
    assert!(outcome.valid);

    let snapshot = outcome.license.unwrap();
    assert_eq!(snapshot.organization, "ACME Corp");
    assert_eq!(snapshot.tier, LicenseTier::Starter);

    let stored = SurrealLicenseRepository::new(db.clone())
        .get_by_id(license.id)
        .await
        .unwrap();
    assert!(stored.last_validated.is_some());

    let usage = SurrealUsageRepository::new(db)
        .summarize(org_id, Utc::now() - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].product_id, "prod-a");
    assert_eq!(usage[0].event_type, "license_validation");
    assert_eq!(usage[0].total_quantity, 1);
}

/// A validation without a product is not a billable event.
#[tokio::test]
async fn bare_validation_does_not_meter_usage() {
    let (service, org_id, db) = setup().await;

    let license = service
        .create_license(create_input(org_id, LicenseTier::Starter))
        .await
        .unwrap();
    assert!(service.validate(validate_key(&license.key)).await.unwrap().valid);

    let usage = SurrealUsageRepository::new(db)
        .summarize(org_id, Utc::now() - Duration::days(1))
        .await
        .unwrap();
    assert!(usage.is_empty());
}
