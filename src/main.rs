mod config;
mod entities;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod state;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::routes::create_routes;
use crate::services::audit::AuditQueue;
use crate::services::record_store::SeaOrmRecordStore;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "project-files", version, about = "Project file attachment service")]
struct Cli {
    /// Address to listen on; overrides BIND_ADDR
    #[arg(long)]
    bind: Option<String>,

    /// Do not run pending migrations on startup
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "project_files=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let bind_addr = cli.bind.unwrap_or_else(|| config.bind_addr.clone());

    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    if cli.skip_migrations {
        tracing::info!("Migrations | skipped");
    } else {
        Migrator::up(&db, None)
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Migrations | up to date");
    }

    let store = Arc::new(SeaOrmRecordStore::new(db));
    let (audit, audit_worker) = AuditQueue::spawn(store.clone(), config.audit_retry.clone());
    let state = AppState::new(store, audit, config.upload_policy.clone(), &config.jwt_secret)
        .with_list_capacity(config.file_list_capacity);

    let app = create_routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router (and every queue handle in it) is gone; let the worker drain.
    audit_worker.join().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
