use anyhow::{Context, Result};

use crate::config::DatabaseEnvConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// Shared SQLite pool plus schema bootstrap
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(config: &DatabaseEnvConfig) -> Result<Self> {
        let db_url = config.url.as_str();

        // Ensure the directory exists if it's a file path
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal) // Readers don't block the counter writer
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        info!("Connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// Private in-memory database on a single pinned connection.
    ///
    /// Every pooled connection to `sqlite::memory:` would open its own empty
    /// database, so the pool is capped at one connection that never expires.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        // 1. Counters: one row per named sequence, only ever touched by the
        //    single-statement upserts in SqliteCounterRepository.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS counters (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL CHECK (value >= 0),
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create counters table")?;

        // 2. Documents (quotes and orders)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                code TEXT UNIQUE,
                code_number INTEGER,
                customer TEXT NOT NULL,
                lines_json TEXT NOT NULL,
                subtotal TEXT NOT NULL,
                tax TEXT NOT NULL,
                total TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create documents table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_documents_kind_number
            ON documents (kind, code_number);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create documents code index")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_documents_kind_created
            ON documents (kind, created_at);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create documents creation index")?;

        info!("Database schema initialized.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_schema_is_created() {
        let db = Database::in_memory().await.unwrap();

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&db.pool)
                .await
                .unwrap();

        assert_eq!(tables, vec!["counters", "documents"]);
    }

    #[tokio::test]
    async fn test_file_database_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("codes.db");
        let config = DatabaseEnvConfig::with_url(format!("sqlite://{}", path.display()));

        let db = Database::new(&config).await.unwrap();
        db.pool.close().await;

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_init_is_repeatable() {
        let db = Database::in_memory().await.unwrap();
        db.init().await.unwrap();
    }
}
