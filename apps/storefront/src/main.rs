//! # Souq Storefront Entry Point
//!
//! Boots one storefront instance: logging, configuration, database,
//! session restore. The dashboards drive it through the command functions
//! in `souq_storefront::commands`.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load `SOUQ_*` configuration
//! 3. Determine database and session paths (app data directory)
//! 4. Connect to database & run migrations
//! 5. Build state objects (rates from the database, restored session, empty cart)
//! 6. Log a readiness summary

use std::sync::Arc;

use tracing::info;

use souq_db::{Database, DbConfig};
use souq_storefront::state::FileSessionStorage;
use souq_storefront::{
    get_database_path, get_session_path, init_tracing, log_startup_summary, AppServices,
    SessionChannel, StorefrontConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    info!("Starting Souq storefront");

    let config = StorefrontConfig::from_env()?;

    let db_path = get_database_path(&config)?;
    let session_path = get_session_path(&config)?;
    info!(?db_path, ?session_path, "Data paths determined");

    let db = Database::new(DbConfig::new(db_path)).await?;
    info!("Database connected and migrations applied");

    let app = AppServices::with_db(
        config,
        db,
        Arc::new(FileSessionStorage::new(session_path)),
        SessionChannel::default(),
    )
    .await?;

    log_startup_summary(&app).await;

    app.db.inner().close().await;
    Ok(())
}
