//! Main entry point for the realty backend.
//!
//! Loads configuration, opens the database and applies pending migrations so
//! the user store is ready for the credential services.

use anyhow::Result;
use realty_backend::auth::service::AuthService;
use realty_backend::config::Config;
use realty_backend::database::Database;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    realty_backend::telemetry::init();

    let config = Config::from_env()?;
    let db = Database::new(&config).await?;
    db.migrate().await?;

    // Fails early on an unusable session secret
    AuthService::new(db.pool(), &config)?;

    info!(
        reset_window_seconds = config.password_reset_expires_in_seconds,
        hash_cost = config.password_hash_cost,
        "Realty backend ready"
    );

    db.close().await;
    Ok(())
}
