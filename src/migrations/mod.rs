// Embedded schema migrations, run at startup unless disabled

pub mod diesel;

use tracing::{error, info};

pub use self::diesel::{check_migration_status, run_migrations, MigrationStatus};

/// Apply pending PostgreSQL migrations
pub async fn run_all_migrations(
    database_url: &str,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    info!("[MIGRATIONS] Running Diesel (PostgreSQL) migrations...");

    match run_migrations(database_url.to_string()).await {
        Ok(0) => {
            info!("[MIGRATIONS] Diesel migrations up to date");
            Ok(0)
        },
        Ok(applied) => {
            info!("[MIGRATIONS] Applied {} Diesel migrations", applied);
            Ok(applied)
        },
        Err(e) => {
            error!("[MIGRATIONS] Diesel migration failed: {}", e);
            Err(format!("Diesel migration failed: {}", e).into())
        },
    }
}

pub fn should_run_migrations(config: &crate::app_config::AppConfig) -> bool {
    !config.features.disable_embedded_migrations
}
