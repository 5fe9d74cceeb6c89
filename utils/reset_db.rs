use anyhow::Context;
use sea_orm::{ConnectionTrait, Database, DbBackend, Statement};
use std::env;

const TABLES: &[&str] = &[
    "timeline_events",
    "files",
    "projects",
    "profiles",
    "seaql_migrations",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().init();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let db = Database::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    for table in TABLES {
        db.execute(Statement::from_string(
            DbBackend::Postgres,
            format!("DROP TABLE IF EXISTS \"{}\" CASCADE;", table),
        ))
        .await
        .with_context(|| format!("Failed to drop {}", table))?;
        tracing::info!(table, "Reset | dropped");
    }

    tracing::info!("Database reset successfully");
    Ok(())
}
