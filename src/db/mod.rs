mod models;

pub use models::*;

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::config::Config;

pub type DbPool = SqlitePool;

/// Errors returned by the data-access layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The requested record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A unique constraint rejected the write.
    #[error("constraint violation: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Conflict(db_err.message().to_string())
            }
            _ => DbError::Database(err),
        }
    }
}

/// Execute a SQL migration file, properly handling comments.
/// Comment lines are dropped before splitting so a `;` inside one is ignored.
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in split_statements(sql) {
        sqlx::query(&statement).execute(pool).await?;
    }
    Ok(())
}

fn split_statements(sql: &str) -> Vec<String> {
    let cleaned: String = sql
        .lines()
        .filter(|line| !line.trim().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    cleaned
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn init(config: &Config) -> Result<DbPool> {
    if config.database.url.is_none() {
        std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
            format!(
                "Failed to create data directory: {}",
                config.server.data_dir.display()
            )
        })?;
    }

    let db_url = config.database_url();
    info!("Initializing database at {}", db_url);

    let options = SqliteConnectOptions::from_str(&db_url)
        .with_context(|| format!("Invalid database URL: {}", db_url))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Open a private in-memory database with the full schema.
///
/// The pool is pinned to a single connection that never expires, since every
/// SQLite `:memory:` connection is a separate database.
pub async fn init_memory() -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: products, users, orders and the order/product association
    execute_sql(pool, include_str!("../../migrations/001_initial.sql"))
        .await
        .context("Migration 001_initial failed")?;

    info!("Migrations completed");
    Ok(())
}
