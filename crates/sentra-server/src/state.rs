//! Shared application state threaded through axum handlers.

use std::sync::Arc;

use sentra_db::repository::{
    SurrealAgentRepository, SurrealAlertRepository, SurrealApiKeyRepository,
    SurrealCommandRepository, SurrealLicenseRepository, SurrealMetricRepository,
    SurrealOrganizationRepository, SurrealUsageRepository, SurrealValidationLogRepository,
    SurrealWebhookRepository,
};
use sentra_license::service::LicenseService;
use sentra_telemetry::commands::CommandService;
use sentra_telemetry::registry::AgentService;
use sentra_telemetry::service::TelemetryService;
use surrealdb::{Connection, Surreal};

use crate::rate_limit::FixedWindowLimiter;

/// Bearer-token verification settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// Expected JWT issuer (`iss` claim).
    pub jwt_issuer: String,
}

/// Server-wide settings surfaced to handlers.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Base URL agents should subscribe to for live updates.
    pub subscription_url: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            subscription_url: "wss://localhost:8080/ws/agents".into(),
        }
    }
}

type Licenses<C> = LicenseService<
    SurrealLicenseRepository<C>,
    SurrealValidationLogRepository<C>,
    SurrealUsageRepository<C>,
    SurrealOrganizationRepository<C>,
>;
type Telemetry<C> = TelemetryService<
    SurrealAgentRepository<C>,
    SurrealMetricRepository<C>,
    SurrealAlertRepository<C>,
>;
type Commands<C> = CommandService<SurrealAgentRepository<C>, SurrealCommandRepository<C>>;

/// Application state: services plus the raw repositories the read-only
/// routes consume directly.
pub struct AppState<C: Connection> {
    pub licenses: Arc<Licenses<C>>,
    pub telemetry: Arc<Telemetry<C>>,
    pub agents: Arc<AgentService<SurrealAgentRepository<C>>>,
    pub commands: Arc<Commands<C>>,

    pub license_repo: SurrealLicenseRepository<C>,
    pub validation_repo: SurrealValidationLogRepository<C>,
    pub organization_repo: SurrealOrganizationRepository<C>,
    pub api_key_repo: SurrealApiKeyRepository<C>,
    pub agent_repo: SurrealAgentRepository<C>,
    pub webhook_repo: SurrealWebhookRepository<C>,

    pub auth: Arc<AuthSettings>,
    pub settings: Arc<ServerSettings>,
    pub validate_limiter: Arc<FixedWindowLimiter>,
}

impl<C: Connection> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            licenses: self.licenses.clone(),
            telemetry: self.telemetry.clone(),
            agents: self.agents.clone(),
            commands: self.commands.clone(),
            license_repo: self.license_repo.clone(),
            validation_repo: self.validation_repo.clone(),
            organization_repo: self.organization_repo.clone(),
            api_key_repo: self.api_key_repo.clone(),
            agent_repo: self.agent_repo.clone(),
            webhook_repo: self.webhook_repo.clone(),
            auth: self.auth.clone(),
            settings: self.settings.clone(),
            validate_limiter: self.validate_limiter.clone(),
        }
    }
}

impl<C: Connection> AppState<C> {
    pub fn new(
        db: Surreal<C>,
        auth: AuthSettings,
        settings: ServerSettings,
        validate_limiter: FixedWindowLimiter,
    ) -> Self {
        let license_repo = SurrealLicenseRepository::new(db.clone());
        let validation_repo = SurrealValidationLogRepository::new(db.clone());
        let usage_repo = SurrealUsageRepository::new(db.clone());
        let organization_repo = SurrealOrganizationRepository::new(db.clone());
        let api_key_repo = SurrealApiKeyRepository::new(db.clone());
        let agent_repo = SurrealAgentRepository::new(db.clone());
        let metric_repo = SurrealMetricRepository::new(db.clone());
        let alert_repo = SurrealAlertRepository::new(db.clone());
        let command_repo = SurrealCommandRepository::new(db.clone());
        let webhook_repo = SurrealWebhookRepository::new(db);

        Self {
            licenses: Arc::new(LicenseService::new(
                license_repo.clone(),
                validation_repo.clone(),
                usage_repo,
                organization_repo.clone(),
            )),
            telemetry: Arc::new(TelemetryService::new(
                agent_repo.clone(),
                metric_repo,
                alert_repo,
            )),
            agents: Arc::new(AgentService::new(agent_repo.clone())),
            commands: Arc::new(CommandService::new(agent_repo.clone(), command_repo)),
            license_repo,
            validation_repo,
            organization_repo,
            api_key_repo,
            agent_repo,
            webhook_repo,
            auth: Arc::new(auth),
            settings: Arc::new(settings),
            validate_limiter: Arc::new(validate_limiter),
        }
    }
}
