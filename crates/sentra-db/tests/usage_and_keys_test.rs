//! Integration tests for the usage ledger, API key, validation-log,
//! and webhook repositories using in-memory SurrealDB.

use chrono::{Duration, Utc};
use sentra_core::models::api_key::NewApiKey;
use sentra_core::models::usage::CreateUsageRecord;
use sentra_core::models::validation::CreateLicenseValidation;
use sentra_core::models::webhook::NewWebhook;
use sentra_core::repository::{
    ApiKeyRepository, Pagination, UsageRepository, ValidationLogRepository, WebhookRepository,
};
use sentra_db::repository::{
    SurrealApiKeyRepository, SurrealUsageRepository, SurrealValidationLogRepository,
    SurrealWebhookRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    sentra_db::run_migrations(&db).await.unwrap();
    db
}

fn usage_event(org: Uuid, product: &str, event: &str, quantity: u64) -> CreateUsageRecord {
    CreateUsageRecord {
        organization_id: org,
        license_id: None,
        product_id: product.into(),
        event_type: event.into(),
        quantity,
        metadata: Default::default(),
    }
}

#[tokio::test]
async fn usage_summary_groups_by_product_and_event() {
    let db = setup().await;
    let repo = SurrealUsageRepository::new(db);
    let org = Uuid::new_v4();

    repo.append(usage_event(org, "prod-a", "license_validation", 1))
        .await
        .unwrap();
    repo.append(usage_event(org, "prod-a", "license_validation", 1))
        .await
        .unwrap();
    repo.append(usage_event(org, "prod-a", "api_call", 40))
        .await
        .unwrap();
    repo.append(usage_event(org, "prod-b", "api_call", 7))
        .await
        .unwrap();
    // Another organization's usage stays out of the summary.
    repo.append(usage_event(Uuid::new_v4(), "prod-a", "api_call", 99))
        .await
        .unwrap();

    let from = Utc::now() - Duration::days(1);
    let mut summary = repo.summarize(org, from).await.unwrap();
    summary.sort_by(|a, b| {
        (&a.product_id, &a.event_type).cmp(&(&b.product_id, &b.event_type))
    });

    assert_eq!(summary.len(), 3);
    assert_eq!(summary[0].product_id, "prod-a");
    assert_eq!(summary[0].event_type, "api_call");
    assert_eq!(summary[0].total_quantity, 40);
    assert_eq!(summary[1].event_type, "license_validation");
    assert_eq!(summary[1].total_quantity, 2);
    assert_eq!(summary[2].product_id, "prod-b");
    assert_eq!(summary[2].total_quantity, 7);
}

#[tokio::test]
async fn usage_summary_respects_window_start() {
    let db = setup().await;
    let repo = SurrealUsageRepository::new(db);
    let org = Uuid::new_v4();

    repo.append(usage_event(org, "prod-a", "api_call", 5))
        .await
        .unwrap();

    // A window starting in the future sees nothing.
    let summary = repo
        .summarize(org, Utc::now() + Duration::days(1))
        .await
        .unwrap();
    assert!(summary.is_empty());
}

#[tokio::test]
async fn api_key_usage_is_counted() {
    let db = setup().await;
    let repo = SurrealApiKeyRepository::new(db);
    let org = Uuid::new_v4();

    let key = repo
        .create(NewApiKey {
            organization_id: org,
            name: "ci".into(),
            key_hash: "abc123".into(),
            scopes: vec!["licenses:validate".into()],
            expires_at: None,
        })
        .await
        .unwrap();

    assert!(key.is_active);
    assert_eq!(key.usage_count, 0);
    assert!(key.last_used.is_none());

    repo.record_use(key.id).await.unwrap();
    repo.record_use(key.id).await.unwrap();

    let fetched = repo.get_by_hash("abc123").await.unwrap();
    assert_eq!(fetched.usage_count, 2);
    assert!(fetched.last_used.is_some());
}

#[tokio::test]
async fn validation_log_separates_unknown_key_sentinel() {
    let db = setup().await;
    let repo = SurrealValidationLogRepository::new(db);
    let license_id = Uuid::new_v4();

    repo.append(CreateLicenseValidation {
        license_id: Some(license_id),
        is_valid: true,
        reason: None,
        ip_address: None,
        user_agent: None,
        machine_id: None,
        product_id: None,
    })
    .await
    .unwrap();

    repo.append(CreateLicenseValidation {
        license_id: None,
        is_valid: false,
        reason: Some("License key not found".into()),
        ip_address: Some("10.0.0.9".into()),
        user_agent: None,
        machine_id: None,
        product_id: None,
    })
    .await
    .unwrap();

    let for_license = repo.list_recent(Some(license_id), 10).await.unwrap();
    assert_eq!(for_license.len(), 1);
    assert!(for_license[0].is_valid);

    let unknown = repo.list_recent(None, 10).await.unwrap();
    assert_eq!(unknown.len(), 1);
    assert!(!unknown[0].is_valid);
    assert_eq!(unknown[0].reason.as_deref(), Some("License key not found"));
}

#[tokio::test]
async fn webhook_registry_roundtrip() {
    let db = setup().await;
    let repo = SurrealWebhookRepository::new(db);
    let org = Uuid::new_v4();

    let webhook = repo
        .create(NewWebhook {
            organization_id: org,
            url: "https://ops.example/hooks/sentra".into(),
            events: vec!["license.expired".into(), "agent.alert".into()],
            secret_hash: "deadbeef".into(),
        })
        .await
        .unwrap();
    assert!(webhook.is_active);
    assert_eq!(webhook.success_count, 0);

    let page = repo.list(org, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 1);

    let subscribed = repo.get_by_event(org, "agent.alert").await.unwrap();
    assert_eq!(subscribed.len(), 1);

    let not_subscribed = repo.get_by_event(org, "agent.deleted").await.unwrap();
    assert!(not_subscribed.is_empty());

    repo.delete(org, webhook.id).await.unwrap();
    let page = repo.list(org, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 0);

    // Deleting again reports NotFound.
    assert!(repo.delete(org, webhook.id).await.is_err());
}
