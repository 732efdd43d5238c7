//! CampusEvents
//!
//! Main application entry point

use tracing::info;

use CampusEvents::{
    config::Settings,
    utils::logging,
    database::{DatabaseService, connection::{create_pool, run_migrations, DatabaseConfig}},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", CampusEvents::info());

    // Initialize database connection
    info!("Connecting to database...");
    let db_pool = create_pool(&DatabaseConfig::from_settings(&settings.database)).await?;

    // Run database migrations
    run_migrations(&db_pool).await?;

    let database_service = DatabaseService::new(db_pool);

    info!("Initializing services...");
    let state = AppState::new(settings, database_service)?;

    let health = state.services.health_check().await;
    if !health.is_healthy() {
        for issue in health.get_issues() {
            tracing::warn!(issue = %issue, "Optional service unavailable at startup");
        }
    }

    CampusEvents::serve(state).await?;
    Ok(())
}
