//! Integration tests for agent registration, telemetry ingestion, and
//! command dispatch against in-memory SurrealDB.

use sentra_core::error::SentraError;
use sentra_core::models::alert::AlertSeverity;
use sentra_core::models::command::CommandStatus;
use sentra_core::repository::{AlertFilter, MetricQuery};
use sentra_db::repository::{
    SurrealAgentRepository, SurrealAlertRepository, SurrealCommandRepository,
    SurrealMetricRepository,
};
use sentra_telemetry::commands::CommandService;
use sentra_telemetry::registry::{AgentService, RegisterAgentInput, RegisterOutcome};
use sentra_telemetry::service::{IngestInput, TelemetryService};
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;

struct Harness {
    registry: AgentService<SurrealAgentRepository<Db>>,
    telemetry: TelemetryService<
        SurrealAgentRepository<Db>,
        SurrealMetricRepository<Db>,
        SurrealAlertRepository<Db>,
    >,
    commands: CommandService<SurrealAgentRepository<Db>, SurrealCommandRepository<Db>>,
    org_id: Uuid,
}

async fn setup() -> Harness {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    sentra_db::run_migrations(&db).await.unwrap();

    Harness {
        registry: AgentService::new(SurrealAgentRepository::new(db.clone())),
        telemetry: TelemetryService::new(
            SurrealAgentRepository::new(db.clone()),
            SurrealMetricRepository::new(db.clone()),
            SurrealAlertRepository::new(db.clone()),
        ),
        commands: CommandService::new(
            SurrealAgentRepository::new(db.clone()),
            SurrealCommandRepository::new(db),
        ),
        org_id: Uuid::new_v4(),
    }
}

fn register_input(hostname: &str) -> RegisterAgentInput {
    RegisterAgentInput {
        hostname: hostname.into(),
        ip_address: Some("10.0.0.5".into()),
        os_type: "linux".into(),
        os_version: Some("6.8".into()),
        agent_version: "1.4.2".into(),
        config: None,
    }
}

fn system_metrics(data: serde_json::Value) -> IngestInput {
    IngestInput {
        metric_type: "system".into(),
        metric_data: data,
        timestamp: None,
    }
}

// -----------------------------------------------------------------------
// Registration
// -----------------------------------------------------------------------

#[tokio::test]
async fn register_creates_then_updates() {
    let h = setup().await;

    let first = h
        .registry
        .register(h.org_id, register_input("web-01"))
        .await
        .unwrap();
    assert_eq!(first.outcome, RegisterOutcome::Created);
    assert!(first.agent.api_key.starts_with("agent_"));

    let mut again = register_input("web-01");
    again.agent_version = "1.5.0".into();
    let second = h.registry.register(h.org_id, again).await.unwrap();

    assert_eq!(second.outcome, RegisterOutcome::Updated);
    assert_eq!(second.agent.id, first.agent.id);
    // Re-registration keeps the existing credential.
    assert_eq!(second.agent.api_key, first.agent.api_key);
    assert_eq!(second.agent.agent_version, "1.5.0");
}

#[tokio::test]
async fn same_hostname_in_other_org_is_a_new_agent() {
    let h = setup().await;

    let a = h
        .registry
        .register(h.org_id, register_input("web-01"))
        .await
        .unwrap();
    let b = h
        .registry
        .register(Uuid::new_v4(), register_input("web-01"))
        .await
        .unwrap();

    assert_eq!(a.outcome, RegisterOutcome::Created);
    assert_eq!(b.outcome, RegisterOutcome::Created);
    assert_ne!(a.agent.id, b.agent.id);
}

// -----------------------------------------------------------------------
// Ingestion + alert engine
// -----------------------------------------------------------------------

#[tokio::test]
async fn critical_cpu_creates_exactly_one_alert() {
    let h = setup().await;
    let agent = h
        .registry
        .register(h.org_id, register_input("web-01"))
        .await
        .unwrap()
        .agent;

    let outcome = h
        .telemetry
        .ingest(
            h.org_id,
            agent.id,
            system_metrics(json!({ "cpu_percent": 95 })),
        )
        .await
        .unwrap();

    assert_eq!(outcome.alerts.len(), 1);
    assert_eq!(outcome.alerts[0].alert_type, "cpu");
    assert_eq!(outcome.alerts[0].severity, AlertSeverity::Critical);
    assert_eq!(outcome.alerts[0].message, "CPU usage critical: 95%");

    // One metric row and one alert row persisted.
    let metrics = h
        .telemetry
        .list_metrics(h.org_id, agent.id, MetricQuery::default())
        .await
        .unwrap();
    assert_eq!(metrics.len(), 1);

    let alerts = h
        .telemetry
        .list_alerts(h.org_id, agent.id, AlertFilter::default())
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
}

/// There is no suppression window: an identical resubmission creates a
/// second, independent alert row.
#[tokio::test]
async fn duplicate_breaches_create_duplicate_alerts() {
    let h = setup().await;
    let agent = h
        .registry
        .register(h.org_id, register_input("web-01"))
        .await
        .unwrap()
        .agent;

    for _ in 0..2 {
        let outcome = h
            .telemetry
            .ingest(
                h.org_id,
                agent.id,
                system_metrics(json!({ "cpu_percent": 95 })),
            )
            .await
            .unwrap();
        assert_eq!(outcome.alerts.len(), 1);
    }

    let alerts = h
        .telemetry
        .list_alerts(h.org_id, agent.id, AlertFilter::default())
        .await
        .unwrap();
    assert_eq!(alerts.len(), 2);
}

#[tokio::test]
async fn healthy_metrics_create_no_alerts() {
    let h = setup().await;
    let agent = h
        .registry
        .register(h.org_id, register_input("web-01"))
        .await
        .unwrap()
        .agent;

    let outcome = h
        .telemetry
        .ingest(
            h.org_id,
            agent.id,
            system_metrics(json!({ "cpu_percent": 20, "memory_percent": 35, "disk_percent": 50 })),
        )
        .await
        .unwrap();

    assert!(outcome.alerts.is_empty());
}

#[tokio::test]
async fn security_metrics_raise_typed_alerts() {
    let h = setup().await;
    let agent = h
        .registry
        .register(h.org_id, register_input("web-01"))
        .await
        .unwrap()
        .agent;

    let outcome = h
        .telemetry
        .ingest(
            h.org_id,
            agent.id,
            IngestInput {
                metric_type: "security".into(),
                metric_data: json!({
                    "firewall_enabled": false,
                    "antivirus_enabled": true,
                    "updates_available": 17,
                }),
                timestamp: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.alerts.len(), 2);
    assert_eq!(outcome.alerts[0].severity, AlertSeverity::Error);
    assert_eq!(outcome.alerts[0].message, "Firewall is disabled");
    assert_eq!(outcome.alerts[1].severity, AlertSeverity::Warning);
    assert_eq!(outcome.alerts[1].message, "17 updates available");
}

#[tokio::test]
async fn ingest_updates_last_seen() {
    let h = setup().await;
    let agent = h
        .registry
        .register(h.org_id, register_input("web-01"))
        .await
        .unwrap()
        .agent;

    h.telemetry
        .ingest(
            h.org_id,
            agent.id,
            system_metrics(json!({ "cpu_percent": 10 })),
        )
        .await
        .unwrap();

    let fetched = h.registry.get(h.org_id, agent.id).await.unwrap();
    assert!(fetched.last_seen.is_some());
}

#[tokio::test]
async fn ingest_for_unknown_agent_is_not_found() {
    let h = setup().await;

    let result = h
        .telemetry
        .ingest(
            h.org_id,
            Uuid::new_v4(),
            system_metrics(json!({ "cpu_percent": 95 })),
        )
        .await;

    assert!(matches!(result, Err(SentraError::NotFound { .. })));
}

#[tokio::test]
async fn ingest_is_tenant_scoped() {
    let h = setup().await;
    let agent = h
        .registry
        .register(h.org_id, register_input("web-01"))
        .await
        .unwrap()
        .agent;

    // Another organization cannot feed this agent.
    let result = h
        .telemetry
        .ingest(
            Uuid::new_v4(),
            agent.id,
            system_metrics(json!({ "cpu_percent": 95 })),
        )
        .await;

    assert!(matches!(result, Err(SentraError::NotFound { .. })));
}

// -----------------------------------------------------------------------
// Alert resolution
// -----------------------------------------------------------------------

#[tokio::test]
async fn alert_resolution_is_explicit_and_terminal() {
    let h = setup().await;
    let agent = h
        .registry
        .register(h.org_id, register_input("web-01"))
        .await
        .unwrap()
        .agent;

    h.telemetry
        .ingest(
            h.org_id,
            agent.id,
            system_metrics(json!({ "cpu_percent": 95 })),
        )
        .await
        .unwrap();

    let alerts = h
        .telemetry
        .list_alerts(h.org_id, agent.id, AlertFilter::default())
        .await
        .unwrap();
    let alert_id = alerts[0].id;
    let operator = Uuid::new_v4();

    let resolved = h
        .telemetry
        .resolve_alert(h.org_id, agent.id, alert_id, operator)
        .await
        .unwrap();
    assert!(resolved.resolved);
    assert_eq!(resolved.resolved_by, Some(operator));

    // Resolving again fails; the record is terminal.
    let second = h
        .telemetry
        .resolve_alert(h.org_id, agent.id, alert_id, Uuid::new_v4())
        .await;
    assert!(second.is_err());
}

// -----------------------------------------------------------------------
// Command dispatch
// -----------------------------------------------------------------------

#[tokio::test]
async fn commands_queue_pending_and_list_by_status() {
    let h = setup().await;
    let agent = h
        .registry
        .register(h.org_id, register_input("web-01"))
        .await
        .unwrap()
        .agent;
    let operator = Uuid::new_v4();

    let command = h
        .commands
        .enqueue(
            h.org_id,
            agent.id,
            "collect_diagnostics".into(),
            json!({ "verbose": true }),
            operator,
        )
        .await
        .unwrap();
    assert_eq!(command.status, CommandStatus::Pending);

    let pending = h
        .commands
        .list(h.org_id, agent.id, Some(CommandStatus::Pending), 100)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);

    // Enqueueing for an unknown agent fails.
    let result = h
        .commands
        .enqueue(
            h.org_id,
            Uuid::new_v4(),
            "noop".into(),
            json!({}),
            operator,
        )
        .await;
    assert!(result.is_err());
}
