use crate::domain::counter::{DocumentCode, DocumentKind};
use crate::domain::document::{Document, LineItem, Totals};
use crate::domain::errors::CodeError;
use crate::domain::repositories::{CodeResult, DocumentRepository};
use crate::infrastructure::persistence::database::Database;
use async_trait::async_trait;
use chrono::DateTime;
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

pub struct SqliteDocumentRepository {
    database: Database,
}

impl SqliteDocumentRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn map_row(row: &SqliteRow) -> CodeResult<Document> {
        let id: String = row.try_get("id")?;
        let kind: String = row.try_get("kind")?;
        let code: Option<String> = row.try_get("code")?;
        let lines_json: String = row.try_get("lines_json")?;
        let created_at: i64 = row.try_get("created_at")?;

        let lines: Vec<LineItem> = serde_json::from_str(&lines_json)?;

        Ok(Document {
            id: Uuid::parse_str(&id).map_err(|e| CodeError::Serialization(e.to_string()))?,
            kind: DocumentKind::from_str(&kind).map_err(|e| CodeError::Serialization(e.to_string()))?,
            code: code.as_deref().map(DocumentCode::from_str).transpose()?,
            customer: row.try_get("customer")?,
            lines,
            totals: Totals {
                subtotal: decimal_column(row, "subtotal")?,
                tax: decimal_column(row, "tax")?,
                total: decimal_column(row, "total")?,
            },
            created_at: DateTime::from_timestamp_micros(created_at).ok_or_else(|| {
                CodeError::Serialization(format!("invalid created_at {}", created_at))
            })?,
        })
    }
}

fn decimal_column(row: &SqliteRow, column: &str) -> CodeResult<Decimal> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw)
        .map_err(|e| CodeError::Serialization(format!("column {}: {}", column, e)))
}

fn code_number(code: &DocumentCode) -> CodeResult<i64> {
    i64::try_from(code.number).map_err(|_| CodeError::CounterOverflow {
        name: code.kind.counter_key().to_string(),
    })
}

#[async_trait]
impl DocumentRepository for SqliteDocumentRepository {
    async fn insert(&self, document: &Document) -> CodeResult<()> {
        let number = document.code.as_ref().map(code_number).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, kind, code, code_number, customer, lines_json,
                subtotal, tax, total, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document.id.to_string())
        .bind(document.kind.to_string())
        .bind(document.code.map(|c| c.to_string()))
        .bind(number)
        .bind(&document.customer)
        .bind(serde_json::to_string(&document.lines)?)
        .bind(document.totals.subtotal.to_string())
        .bind(document.totals.tax.to_string())
        .bind(document.totals.total.to_string())
        .bind(document.created_at.timestamp_micros())
        .execute(&self.database.pool)
        .await?;

        match document.code {
            Some(code) => info!("Persisted {} {}", document.kind, code),
            None => info!("Persisted uncoded {} {}", document.kind, document.id),
        }
        Ok(())
    }

    async fn find_by_code(&self, code: &DocumentCode) -> CodeResult<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE code = ?")
            .bind(code.to_string())
            .fetch_optional(&self.database.pool)
            .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn find_without_code(&self, kind: DocumentKind) -> CodeResult<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT * FROM documents WHERE kind = ? AND code IS NULL ORDER BY created_at ASC, id ASC",
        )
        .bind(kind.to_string())
        .fetch_all(&self.database.pool)
        .await?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn assign_code(&self, id: Uuid, code: &DocumentCode) -> CodeResult<bool> {
        let result = sqlx::query(
            "UPDATE documents SET code = ?, code_number = ? WHERE id = ? AND kind = ? AND code IS NULL",
        )
        .bind(code.to_string())
        .bind(code_number(code)?)
        .bind(id.to_string())
        .bind(code.kind.to_string())
        .execute(&self.database.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn max_code_number(&self, kind: DocumentKind) -> CodeResult<u64> {
        let max: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(code_number), 0) FROM documents WHERE kind = ?",
        )
        .bind(kind.to_string())
        .fetch_one(&self.database.pool)
        .await?;

        u64::try_from(max).map_err(|_| CodeError::storage(format!("negative code number {}", max)))
    }
}
