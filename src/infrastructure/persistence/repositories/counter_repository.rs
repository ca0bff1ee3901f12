use crate::domain::counter::{Counter, CounterName};
use crate::domain::errors::CodeError;
use crate::domain::repositories::{CodeResult, CounterRepository};
use crate::infrastructure::persistence::database::Database;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use tracing::{debug, info, warn};

pub struct SqliteCounterRepository {
    database: Database,
}

impl SqliteCounterRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

fn to_db_value(name: &CounterName, value: u64) -> CodeResult<i64> {
    i64::try_from(value).map_err(|_| CodeError::CounterOverflow {
        name: name.to_string(),
    })
}

fn from_db_value(name: &str, value: i64) -> CodeResult<u64> {
    u64::try_from(value)
        .map_err(|_| CodeError::storage(format!("counter {} holds negative value {}", name, value)))
}

#[async_trait]
impl CounterRepository for SqliteCounterRepository {
    /// Create-or-increment as one statement inside a write transaction.
    ///
    /// The row is locked by the UPSERT itself; there is no read before the
    /// write, so concurrent writers serialize on SQLite's write lock and each
    /// sees the value left by the previous commit.
    async fn upsert_and_increment(&self, name: &CounterName) -> CodeResult<u64> {
        let mut tx = self.database.pool.begin().await?;

        let value: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO counters (name, value, updated_at)
            VALUES (?, 1, ?)
            ON CONFLICT(name) DO UPDATE SET
                value = counters.value + 1,
                updated_at = excluded.updated_at
            WHERE counters.value < 9223372036854775807
            RETURNING value
            "#,
        )
        .bind(name.as_str())
        .bind(Utc::now().timestamp())
        .fetch_optional(&mut *tx)
        .await?;

        // No row back means the WHERE guard refused the update
        let Some(value) = value else {
            tx.rollback().await?;
            return Err(CodeError::CounterOverflow {
                name: name.to_string(),
            });
        };

        tx.commit().await?;

        debug!("Counter {} advanced to {}", name, value);
        from_db_value(name.as_str(), value)
    }

    async fn current(&self, name: &CounterName) -> CodeResult<Option<u64>> {
        let value: Option<i64> = sqlx::query_scalar("SELECT value FROM counters WHERE name = ?")
            .bind(name.as_str())
            .fetch_optional(&self.database.pool)
            .await?;

        value.map(|v| from_db_value(name.as_str(), v)).transpose()
    }

    async fn set(&self, name: &CounterName, value: u64) -> CodeResult<()> {
        let db_value = to_db_value(name, value)?;

        sqlx::query(
            r#"
            INSERT INTO counters (name, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name.as_str())
        .bind(db_value)
        .bind(Utc::now().timestamp())
        .execute(&self.database.pool)
        .await?;

        warn!("Counter {} reset to {}", name, value);
        Ok(())
    }

    async fn raise_to(&self, name: &CounterName, value: u64) -> CodeResult<u64> {
        let db_value = to_db_value(name, value)?;

        let stored: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO counters (name, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                value = MAX(counters.value, excluded.value),
                updated_at = excluded.updated_at
            RETURNING value
            "#,
        )
        .bind(name.as_str())
        .bind(db_value)
        .bind(Utc::now().timestamp())
        .fetch_one(&self.database.pool)
        .await?;

        info!("Counter {} raised to at least {} (now {})", name, value, stored);
        from_db_value(name.as_str(), stored)
    }

    async fn list(&self) -> CodeResult<Vec<Counter>> {
        let rows = sqlx::query("SELECT name, value FROM counters ORDER BY name ASC")
            .fetch_all(&self.database.pool)
            .await?;

        let mut counters = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("name")?;
            let value: i64 = row.try_get("value")?;
            counters.push(Counter {
                value: from_db_value(&name, value)?,
                name: CounterName::new(name)?,
            });
        }
        Ok(counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> SqliteCounterRepository {
        SqliteCounterRepository::new(Database::in_memory().await.unwrap())
    }

    fn name(s: &str) -> CounterName {
        CounterName::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_first_increment_creates_row_at_one() {
        let repo = repo().await;
        assert_eq!(repo.current(&name("quote")).await.unwrap(), None);

        assert_eq!(repo.upsert_and_increment(&name("quote")).await.unwrap(), 1);
        assert_eq!(repo.current(&name("quote")).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_increment_after_seed() {
        let repo = repo().await;
        repo.set(&name("order"), 37).await.unwrap();

        assert_eq!(repo.upsert_and_increment(&name("order")).await.unwrap(), 38);
    }

    #[tokio::test]
    async fn test_set_can_lower_but_raise_to_cannot() {
        let repo = repo().await;
        repo.set(&name("order"), 50).await.unwrap();
        repo.set(&name("order"), 20).await.unwrap();
        assert_eq!(repo.current(&name("order")).await.unwrap(), Some(20));

        assert_eq!(repo.raise_to(&name("order"), 5).await.unwrap(), 20);
        assert_eq!(repo.raise_to(&name("order"), 25).await.unwrap(), 25);
        assert_eq!(repo.raise_to(&name("brand-new"), 9).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_overflow_guard_leaves_value_untouched() {
        let repo = repo().await;
        repo.set(&name("order"), i64::MAX as u64).await.unwrap();

        let err = repo.upsert_and_increment(&name("order")).await.unwrap_err();
        assert!(matches!(err, CodeError::CounterOverflow { .. }));
        assert_eq!(
            repo.current(&name("order")).await.unwrap(),
            Some(i64::MAX as u64)
        );
    }

    #[tokio::test]
    async fn test_values_beyond_i64_are_rejected() {
        let repo = repo().await;
        let err = repo.set(&name("order"), u64::MAX).await.unwrap_err();
        assert!(matches!(err, CodeError::CounterOverflow { .. }));
    }

    #[tokio::test]
    async fn test_list_returns_all_counters() {
        let repo = repo().await;
        repo.upsert_and_increment(&name("quote")).await.unwrap();
        repo.upsert_and_increment(&name("quote")).await.unwrap();
        repo.upsert_and_increment(&name("order")).await.unwrap();

        let counters = repo.list().await.unwrap();
        assert_eq!(counters.len(), 2);
        assert_eq!(counters[0].name.as_str(), "order");
        assert_eq!(counters[0].value, 1);
        assert_eq!(counters[1].name.as_str(), "quote");
        assert_eq!(counters[1].value, 2);
    }

    #[tokio::test]
    async fn test_closed_pool_surfaces_storage_error() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteCounterRepository::new(db.clone());
        db.pool.close().await;

        let err = repo.upsert_and_increment(&name("order")).await.unwrap_err();
        assert!(err.is_storage());
    }
}
