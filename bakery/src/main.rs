use bakery::{AppState, Config, Migrator};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    config.init_logging();

    if config.admin_token.is_none() {
        tracing::warn!("BAKERY_ADMIN_TOKEN is not set; only user tokens will be accepted");
    }
    if config.scheduler_url.is_none() {
        tracing::info!("No scheduling service configured; /api/auto-scheduling/generate will answer 503");
    }

    let db = Database::connect(&config.database_url).await?;
    Migrator::up(&db, None).await?;
    tracing::info!("Database ready");

    let bind_addr = config.bind_addr;
    let app = bakery::app(AppState::new(db, config)?);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(%bind_addr, "API listening; docs at /docs");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}
