use agentdock_core::config::AppConfig;
use agentdock_db::{connect, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use super::{CommandFailure, EXIT_DATABASE, EXIT_MIGRATION};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

impl From<BootstrapError> for CommandFailure {
    fn from(error: BootstrapError) -> Self {
        match error {
            BootstrapError::DatabaseConnect(_) => {
                Self::new("db_connectivity", error.to_string(), EXIT_DATABASE)
            }
            BootstrapError::Migration(_) => {
                Self::new("migration", error.to_string(), EXIT_MIGRATION)
            }
        }
    }
}

/// Connects to the configured database and brings its schema up to date.
pub async fn open_database(config: &AppConfig) -> Result<DbPool, BootstrapError> {
    let pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.database_ready",
        max_connections = config.database.max_connections,
        "database connected and migrated"
    );
    Ok(pool)
}
