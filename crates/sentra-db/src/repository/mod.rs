//! SurrealDB repository implementations.

mod agent;
mod api_key;
mod license;
mod organization;
mod telemetry;
mod usage;
mod validation;
mod webhook;

pub use agent::SurrealAgentRepository;
pub use api_key::SurrealApiKeyRepository;
pub use license::SurrealLicenseRepository;
pub use organization::SurrealOrganizationRepository;
pub use telemetry::{SurrealAlertRepository, SurrealCommandRepository, SurrealMetricRepository};
pub use usage::SurrealUsageRepository;
pub use validation::SurrealValidationLogRepository;
pub use webhook::SurrealWebhookRepository;
