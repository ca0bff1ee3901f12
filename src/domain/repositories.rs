//! Repository Pattern Abstractions
//!
//! Storage ports for the code generator and the documents that carry codes.
//!
//! # Design
//!
//! - `CounterRepository`: named counters, mutated through one atomic
//!   upsert-and-increment primitive
//! - `DocumentRepository`: quote and order records
//!
//! # Implementations
//!
//! - `Sqlite*` (infrastructure::persistence): durable, shared by every
//!   process pointed at the same database
//! - `InMemory*` (infrastructure::repositories): tests and single-process use
//!
//! # Example
//!
//! ```rust,no_run
//! use storefront::domain::counter::CounterName;
//! use storefront::domain::repositories::CounterRepository;
//! use storefront::infrastructure::InMemoryCounterRepository;
//!
//! # async {
//! let repo = InMemoryCounterRepository::new();
//! let name = CounterName::new("order").unwrap();
//! assert_eq!(repo.upsert_and_increment(&name).await.unwrap(), 1);
//! # };
//! ```

use crate::domain::counter::{Counter, CounterName, DocumentCode, DocumentKind};
use crate::domain::document::Document;
use crate::domain::errors::CodeError;
use async_trait::async_trait;
use uuid::Uuid;

pub type CodeResult<T> = Result<T, CodeError>;

/// Persistent named counters
#[async_trait]
pub trait CounterRepository: Send + Sync {
    /// Atomically create the counter at 1 or increment it by 1, returning the new value.
    ///
    /// Two concurrent callers for the same name never observe the same value.
    async fn upsert_and_increment(&self, name: &CounterName) -> CodeResult<u64>;

    /// Current value, `None` if the counter has never been used
    async fn current(&self, name: &CounterName) -> CodeResult<Option<u64>>;

    /// Overwrite the counter with an exact value (administrative reset)
    async fn set(&self, name: &CounterName, value: u64) -> CodeResult<()>;

    /// Raise the counter to `value` unless it is already higher. Returns the stored value.
    async fn raise_to(&self, name: &CounterName, value: u64) -> CodeResult<u64>;

    /// All counters, ordered by name
    async fn list(&self) -> CodeResult<Vec<Counter>>;
}

/// Quote and order records
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert(&self, document: &Document) -> CodeResult<()>;

    async fn find_by_code(&self, code: &DocumentCode) -> CodeResult<Option<Document>>;

    /// Documents of `kind` without a code, oldest first (ties broken by id)
    async fn find_without_code(&self, kind: DocumentKind) -> CodeResult<Vec<Document>>;

    /// Attach a code to a document that has none.
    ///
    /// Returns `false` if the document does not exist or already carries a code.
    async fn assign_code(&self, id: Uuid, code: &DocumentCode) -> CodeResult<bool>;

    /// Highest code number in use for `kind`, 0 if none
    async fn max_code_number(&self, kind: DocumentKind) -> CodeResult<u64>;
}
