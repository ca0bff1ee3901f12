//! In-Memory Repository Implementations
//!
//! Thread-safe, in-memory implementations of the repository traits defined
//! in `domain::repositories`.
//!
//! # Features
//!
//! - **Atomic**: every counter mutation happens under one lock acquisition
//! - **Async**: All operations are async-ready
//! - **Testing**: Ideal for unit tests and development
//!
//! # Limitations
//!
//! - Data is lost on application restart
//! - Counters are NOT shared between processes, so codes issued by two
//!   instances will collide. Use the SQLite repositories for anything that
//!   runs more than one worker.

use crate::domain::counter::{Counter, CounterName, DocumentCode, DocumentKind};
use crate::domain::document::Document;
use crate::domain::errors::CodeError;
use crate::domain::repositories::{CodeResult, CounterRepository, DocumentRepository};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Same ceiling as the SQLite INTEGER column
fn check_bound(name: &CounterName, value: u64) -> CodeResult<()> {
    if value > i64::MAX as u64 {
        return Err(CodeError::CounterOverflow {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// In-memory implementation of CounterRepository
#[derive(Clone, Default)]
pub struct InMemoryCounterRepository {
    counters: Arc<Mutex<BTreeMap<CounterName, u64>>>,
}

impl InMemoryCounterRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterRepository for InMemoryCounterRepository {
    async fn upsert_and_increment(&self, name: &CounterName) -> CodeResult<u64> {
        let mut counters = self.counters.lock().await;
        let value = counters.entry(name.clone()).or_insert(0);
        let next = value
            .checked_add(1)
            .filter(|v| *v <= i64::MAX as u64)
            .ok_or_else(|| CodeError::CounterOverflow {
                name: name.to_string(),
            })?;
        *value = next;
        Ok(next)
    }

    async fn current(&self, name: &CounterName) -> CodeResult<Option<u64>> {
        Ok(self.counters.lock().await.get(name).copied())
    }

    async fn set(&self, name: &CounterName, value: u64) -> CodeResult<()> {
        check_bound(name, value)?;
        self.counters.lock().await.insert(name.clone(), value);
        Ok(())
    }

    async fn raise_to(&self, name: &CounterName, value: u64) -> CodeResult<u64> {
        check_bound(name, value)?;
        let mut counters = self.counters.lock().await;
        let stored = counters.entry(name.clone()).or_insert(value);
        *stored = (*stored).max(value);
        Ok(*stored)
    }

    async fn list(&self) -> CodeResult<Vec<Counter>> {
        Ok(self
            .counters
            .lock()
            .await
            .iter()
            .map(|(name, value)| Counter {
                name: name.clone(),
                value: *value,
            })
            .collect())
    }
}

/// In-memory implementation of DocumentRepository
#[derive(Clone, Default)]
pub struct InMemoryDocumentRepository {
    documents: Arc<RwLock<Vec<Document>>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn insert(&self, document: &Document) -> CodeResult<()> {
        let mut documents = self.documents.write().await;
        if let Some(code) = document.code
            && documents.iter().any(|d| d.code == Some(code))
        {
            return Err(CodeError::Conflict {
                reason: format!("code {} already in use", code),
            });
        }
        documents.push(document.clone());
        Ok(())
    }

    async fn find_by_code(&self, code: &DocumentCode) -> CodeResult<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.iter().find(|d| d.code.as_ref() == Some(code)).cloned())
    }

    async fn find_without_code(&self, kind: DocumentKind) -> CodeResult<Vec<Document>> {
        let documents = self.documents.read().await;
        let mut pending: Vec<Document> = documents
            .iter()
            .filter(|d| d.kind == kind && d.code.is_none())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(pending)
    }

    async fn assign_code(&self, id: Uuid, code: &DocumentCode) -> CodeResult<bool> {
        let mut documents = self.documents.write().await;
        if documents.iter().any(|d| d.code.as_ref() == Some(code)) {
            return Err(CodeError::Conflict {
                reason: format!("code {} already in use", code),
            });
        }
        match documents.iter_mut().find(|d| d.id == id && d.kind == code.kind && d.code.is_none()) {
            Some(document) => {
                document.code = Some(*code);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn max_code_number(&self, kind: DocumentKind) -> CodeResult<u64> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter_map(|d| d.code)
            .filter(|c| c.kind == kind)
            .map(|c| c.number)
            .max()
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::LineItem;
    use rust_decimal_macros::dec;

    fn name(s: &str) -> CounterName {
        CounterName::new(s).unwrap()
    }

    fn legacy_document(kind: DocumentKind) -> Document {
        Document::draft(
            kind,
            "Electro Sur",
            vec![LineItem::new("WIRE", 1, dec!(10), dec!(0.21))],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_counter_starts_at_one() {
        let repo = InMemoryCounterRepository::new();
        assert_eq!(repo.current(&name("quote")).await.unwrap(), None);
        assert_eq!(repo.upsert_and_increment(&name("quote")).await.unwrap(), 1);
        assert_eq!(repo.upsert_and_increment(&name("quote")).await.unwrap(), 2);
        assert_eq!(repo.current(&name("quote")).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_raise_to_never_lowers() {
        let repo = InMemoryCounterRepository::new();
        repo.set(&name("order"), 10).await.unwrap();

        assert_eq!(repo.raise_to(&name("order"), 4).await.unwrap(), 10);
        assert_eq!(repo.raise_to(&name("order"), 12).await.unwrap(), 12);
        assert_eq!(repo.raise_to(&name("fresh"), 3).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_increment_overflow_is_an_error() {
        let repo = InMemoryCounterRepository::new();
        repo.set(&name("order"), i64::MAX as u64).await.unwrap();

        let err = repo.upsert_and_increment(&name("order")).await.unwrap_err();
        assert!(matches!(err, CodeError::CounterOverflow { .. }));
        assert_eq!(repo.current(&name("order")).await.unwrap(), Some(i64::MAX as u64));
    }

    #[tokio::test]
    async fn test_values_beyond_i64_are_rejected() {
        let repo = InMemoryCounterRepository::new();

        let err = repo.set(&name("order"), u64::MAX).await.unwrap_err();
        assert!(matches!(err, CodeError::CounterOverflow { .. }));
        let err = repo.raise_to(&name("order"), i64::MAX as u64 + 1).await.unwrap_err();
        assert!(matches!(err, CodeError::CounterOverflow { .. }));
        assert_eq!(repo.current(&name("order")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_name() {
        let repo = InMemoryCounterRepository::new();
        repo.upsert_and_increment(&name("quote")).await.unwrap();
        repo.upsert_and_increment(&name("order")).await.unwrap();

        let names: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name.to_string())
            .collect();
        assert_eq!(names, vec!["order", "quote"]);
    }

    #[tokio::test]
    async fn test_assign_code_only_once() {
        let repo = InMemoryDocumentRepository::new();
        let doc = legacy_document(DocumentKind::Order);
        repo.insert(&doc).await.unwrap();

        let first = DocumentCode::new(DocumentKind::Order, 1);
        let second = DocumentCode::new(DocumentKind::Order, 2);
        assert!(repo.assign_code(doc.id, &first).await.unwrap());
        assert!(!repo.assign_code(doc.id, &second).await.unwrap());

        let found = repo.find_by_code(&first).await.unwrap().unwrap();
        assert_eq!(found.id, doc.id);
        assert_eq!(repo.max_code_number(DocumentKind::Order).await.unwrap(), 1);
        assert_eq!(repo.max_code_number(DocumentKind::Quote).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let repo = InMemoryDocumentRepository::new();
        let code = DocumentCode::new(DocumentKind::Quote, 5);

        let mut a = legacy_document(DocumentKind::Quote);
        a.code = Some(code);
        let mut b = legacy_document(DocumentKind::Quote);
        b.code = Some(code);

        repo.insert(&a).await.unwrap();
        assert!(matches!(
            repo.insert(&b).await,
            Err(CodeError::Conflict { .. })
        ));
    }
}
