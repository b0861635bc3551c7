//! Sentra Server — application entry point.
//!
//! Usage:
//!   sentra-server --http-port 8080 --db-url 127.0.0.1:8000 \
//!       --jwt-public-key jwt-public.pem

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sentra_db::{DbConfig, DbManager};
use sentra_server::rate_limit::FixedWindowLimiter;
use sentra_server::{AppState, AuthSettings, ServerSettings, build_router};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sentra-server")]
#[command(about = "Sentra license validation and agent telemetry server")]
struct Args {
    /// HTTP port to listen on
    #[arg(long, default_value = "8080")]
    http_port: u16,

    /// SurrealDB WebSocket URL
    #[arg(long, default_value = "127.0.0.1:8000")]
    db_url: String,

    /// SurrealDB namespace
    #[arg(long, default_value = "sentra")]
    db_namespace: String,

    /// SurrealDB database name
    #[arg(long, default_value = "main")]
    db_database: String,

    /// SurrealDB username
    #[arg(long, default_value = "root")]
    db_username: String,

    /// SurrealDB password
    #[arg(long, default_value = "root")]
    db_password: String,

    /// Path to the PEM-encoded Ed25519 public key for JWT verification
    #[arg(long)]
    jwt_public_key: PathBuf,

    /// Expected JWT issuer
    #[arg(long, default_value = "sentra")]
    jwt_issuer: String,

    /// Subscription endpoint advertised to registering agents
    #[arg(long, default_value = "wss://localhost:8080/ws/agents")]
    subscription_url: String,

    /// Validation requests allowed per caller per minute
    #[arg(long, default_value = "120")]
    validate_rate_limit: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("sentra=info".parse().unwrap()),
        )
        .json()
        .init();

    let args = Args::parse();

    info!("Starting Sentra server...");

    let jwt_public_key_pem = std::fs::read_to_string(&args.jwt_public_key)
        .with_context(|| format!("reading JWT public key from {:?}", args.jwt_public_key))?;

    let db = DbManager::connect(&DbConfig {
        url: args.db_url,
        namespace: args.db_namespace,
        database: args.db_database,
        username: args.db_username,
        password: args.db_password,
    })
    .await
    .context("connecting to SurrealDB")?;

    sentra_db::run_migrations(db.client())
        .await
        .context("running migrations")?;

    let state = AppState::new(
        db.client().clone(),
        AuthSettings {
            jwt_public_key_pem,
            jwt_issuer: args.jwt_issuer,
        },
        ServerSettings {
            subscription_url: args.subscription_url,
        },
        FixedWindowLimiter::new(args.validate_rate_limit, Duration::from_secs(60)),
    );

    let router = build_router(state);

    let addr = format!("0.0.0.0:{}", args.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(addr = %addr, "HTTP API listening");
    axum::serve(listener, router).await.context("serving HTTP")?;

    Ok(())
}
