use std::fs;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::PipelineConfig;
use crate::error::Result;

/// Open the registry database, creating its directory and file if needed.
pub async fn create_pool(config: &PipelineConfig) -> Result<SqlitePool> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            tracing::info!(directory = %parent.display(), "Creating application directory");
            fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(&config.database_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Pool on a migrated database, ready for registry operations.
pub async fn open(config: &PipelineConfig) -> Result<SqlitePool> {
    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
