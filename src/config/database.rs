use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use super::app::env_parse;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/physique_coach.db";

/// Waiting on a locked database counts against the request, not as an error.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            max_connections: env_parse("DB_MAX_CONNECTIONS", 5)?,
            connect_timeout: Duration::from_secs(env_parse("DB_CONNECT_TIMEOUT", 30)?),
        })
    }

    /// File-backed pool in WAL mode; the parent directory is created on demand.
    pub async fn create_pool(&self) -> Result<SqlitePool> {
        let options = SqliteConnectOptions::from_str(&self.database_url)
            .with_context(|| format!("Invalid DATABASE_URL: {}", self.database_url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let filename = options.clone().get_filename();
        let directory = filename.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(directory) = directory {
            tokio::fs::create_dir_all(directory)
                .await
                .with_context(|| format!("Failed to create {}", directory.display()))?;
        }

        SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.connect_timeout)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open {}", self.database_url))
    }
}

/// One connection that never expires, since the in-memory database dies with it.
pub async fn create_in_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    Ok(SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to apply migrations")
}
