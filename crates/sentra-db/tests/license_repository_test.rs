//! Integration tests for the License repository using in-memory
//! SurrealDB.

use chrono::Utc;
use sentra_core::models::license::{FeatureSet, LicenseStatus, LicenseTier, NewLicense};
use sentra_core::repository::{LicenseRepository, MachineBind, Pagination};
use sentra_db::repository::SurrealLicenseRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    sentra_db::run_migrations(&db).await.unwrap();
    db
}

fn new_license(key: &str, max_machines: u64) -> NewLicense {
    NewLicense {
        key: key.into(),
        organization_id: Uuid::new_v4(),
        tier: LicenseTier::Starter,
        max_users: 25,
        max_products: 5,
        max_api_calls: 10_000,
        max_storage_bytes: 100 * 1024 * 1024 * 1024,
        allowed_products: vec!["prod-a".into()],
        features: FeatureSet {
            email_support: true,
            ..FeatureSet::default()
        },
        expires_at: None,
        is_trial: false,
        trial_ends_at: None,
        max_machines,
    }
}

#[tokio::test]
async fn create_and_get_license() {
    let db = setup().await;
    let repo = SurrealLicenseRepository::new(db);

    let license = repo
        .create(new_license("AAAA-BBBB-CCCC-DDDD-EEEE", 3))
        .await
        .unwrap();

    assert_eq!(license.key, "AAAA-BBBB-CCCC-DDDD-EEEE");
    assert_eq!(license.status, LicenseStatus::Active);
    assert_eq!(license.tier, LicenseTier::Starter);
    assert!(license.machine_ids.is_empty());
    assert!(license.last_validated.is_none());
    assert!(license.features.email_support);

    let by_id = repo.get_by_id(license.id).await.unwrap();
    assert_eq!(by_id.id, license.id);

    let by_key = repo.get_by_key("AAAA-BBBB-CCCC-DDDD-EEEE").await.unwrap();
    assert_eq!(by_key.id, license.id);
}

#[tokio::test]
async fn unknown_key_is_not_found() {
    let db = setup().await;
    let repo = SurrealLicenseRepository::new(db);

    let result = repo.get_by_key("ZZZZ-ZZZZ-ZZZZ-ZZZZ-ZZZZ").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn update_status_persists() {
    let db = setup().await;
    let repo = SurrealLicenseRepository::new(db);

    let license = repo
        .create(new_license("AAAA-BBBB-CCCC-DDDD-FFFF", 3))
        .await
        .unwrap();

    let updated = repo
        .update_status(license.id, LicenseStatus::Suspended)
        .await
        .unwrap();
    assert_eq!(updated.status, LicenseStatus::Suspended);

    let fetched = repo.get_by_id(license.id).await.unwrap();
    assert_eq!(fetched.status, LicenseStatus::Suspended);
}

#[tokio::test]
async fn touch_validated_stamps_timestamp() {
    let db = setup().await;
    let repo = SurrealLicenseRepository::new(db);

    let license = repo
        .create(new_license("AAAA-BBBB-CCCC-DDDD-GGGG", 3))
        .await
        .unwrap();

    let now = Utc::now();
    repo.touch_validated(license.id, now).await.unwrap();

    let fetched = repo.get_by_id(license.id).await.unwrap();
    assert_eq!(fetched.last_validated, Some(now));
}

#[tokio::test]
async fn bind_machine_is_idempotent() {
    let db = setup().await;
    let repo = SurrealLicenseRepository::new(db);

    let license = repo
        .create(new_license("AAAA-BBBB-CCCC-DDDD-HHHH", 2))
        .await
        .unwrap();

    assert_eq!(
        repo.bind_machine(license.id, "hash-1").await.unwrap(),
        MachineBind::Bound
    );
    // Re-binding the same hash never mutates and never fails for
    // capacity.
    assert_eq!(
        repo.bind_machine(license.id, "hash-1").await.unwrap(),
        MachineBind::AlreadyBound
    );

    let fetched = repo.get_by_id(license.id).await.unwrap();
    assert_eq!(fetched.machine_ids, vec!["hash-1".to_string()]);
}

#[tokio::test]
async fn bind_machine_fails_closed_at_capacity() {
    let db = setup().await;
    let repo = SurrealLicenseRepository::new(db);

    let license = repo
        .create(new_license("AAAA-BBBB-CCCC-DDDD-JJJJ", 2))
        .await
        .unwrap();

    assert_eq!(
        repo.bind_machine(license.id, "hash-1").await.unwrap(),
        MachineBind::Bound
    );
    assert_eq!(
        repo.bind_machine(license.id, "hash-2").await.unwrap(),
        MachineBind::Bound
    );
    assert_eq!(
        repo.bind_machine(license.id, "hash-3").await.unwrap(),
        MachineBind::CapacityExceeded
    );

    // A known hash still succeeds at capacity.
    assert_eq!(
        repo.bind_machine(license.id, "hash-2").await.unwrap(),
        MachineBind::AlreadyBound
    );

    let fetched = repo.get_by_id(license.id).await.unwrap();
    assert_eq!(fetched.machine_ids.len(), 2);
}

#[tokio::test]
async fn bind_machine_missing_license_is_not_found() {
    let db = setup().await;
    let repo = SurrealLicenseRepository::new(db);

    let result = repo.bind_machine(Uuid::new_v4(), "hash-1").await;
    assert!(result.is_err());
}

/// The capacity invariant must hold under concurrency: two callers
/// racing for the last free slot cannot both append.
#[tokio::test]
async fn concurrent_binds_never_exceed_capacity() {
    let db = setup().await;
    let repo = SurrealLicenseRepository::new(db.clone());

    let license = repo
        .create(new_license("AAAA-BBBB-CCCC-DDDD-KKKK", 1))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let repo = SurrealLicenseRepository::new(db.clone());
        let license_id = license.id;
        handles.push(tokio::spawn(async move {
            repo.bind_machine(license_id, &format!("hash-{i}")).await
        }));
    }

    let mut bound = 0;
    let mut exceeded = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            MachineBind::Bound => bound += 1,
            MachineBind::AlreadyBound => {}
            MachineBind::CapacityExceeded => exceeded += 1,
        }
    }

    assert_eq!(bound, 1, "exactly one caller may take the last slot");
    assert_eq!(exceeded, 7);

    let fetched = repo.get_by_id(license.id).await.unwrap();
    assert!(fetched.machine_ids.len() as u64 <= fetched.max_machines);
}

#[tokio::test]
async fn list_by_organization_scopes_and_paginates() {
    let db = setup().await;
    let repo = SurrealLicenseRepository::new(db);

    let org = Uuid::new_v4();
    for i in 0..3 {
        let mut input = new_license(&format!("AAAA-BBBB-CCCC-DDD{i}-AAAA"), 3);
        input.organization_id = org;
        repo.create(input).await.unwrap();
    }
    // Another organization's license must not leak in.
    repo.create(new_license("AAAA-BBBB-CCCC-EEEE-AAAA", 3))
        .await
        .unwrap();

    let page = repo
        .list_by_organization(
            org,
            Pagination {
                offset: 0,
                limit: 2,
            },
        )
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|l| l.organization_id == org));
}
