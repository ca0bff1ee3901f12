//! Sequential code generator.
//!
//! Hands out `COT-<n>` / `ORD-<n>` codes from durable named counters.
//! Correctness rests entirely on `CounterRepository::upsert_and_increment`
//! being atomic in the backing store; nothing here caches or pre-allocates
//! numbers, so any number of processes can share one database.
//!
//! No retries are attempted: a retry would consume another number, so the
//! decision belongs to the caller.

use crate::domain::counter::{Counter, CounterName, DocumentCode, DocumentKind};
use crate::domain::repositories::{CodeResult, CounterRepository};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct SequentialCodeGenerator {
    counters: Arc<dyn CounterRepository>,
}

impl SequentialCodeGenerator {
    pub fn new(counters: Arc<dyn CounterRepository>) -> Self {
        Self { counters }
    }

    /// Next number of the named sequence. The first call for a new name returns 1.
    ///
    /// The name is validated before the store is touched.
    pub async fn next_sequential_number(&self, counter_name: &str) -> CodeResult<u64> {
        let name = CounterName::new(counter_name)?;
        self.next_for(&name).await
    }

    async fn next_for(&self, name: &CounterName) -> CodeResult<u64> {
        self.counters
            .upsert_and_increment(name)
            .await
            .inspect_err(|e| error!("Failed to get next sequential number for {}: {}", name, e))
    }

    /// Typed code for a document kind
    pub async fn generate_code(&self, kind: DocumentKind) -> CodeResult<DocumentCode> {
        let number = self.next_for(&kind.counter_name()).await?;
        Ok(DocumentCode::new(kind, number))
    }

    /// `COT-<n>`
    pub async fn generate_quote_code(&self) -> CodeResult<String> {
        Ok(self.generate_code(DocumentKind::Quote).await?.to_string())
    }

    /// `ORD-<n>`
    pub async fn generate_order_code(&self) -> CodeResult<String> {
        Ok(self.generate_code(DocumentKind::Order).await?.to_string())
    }

    pub async fn current_value(&self, counter_name: &str) -> CodeResult<Option<u64>> {
        let name = CounterName::new(counter_name)?;
        self.counters.current(&name).await
    }

    /// Force a counter to an exact value. The next code issued will be `value + 1`.
    ///
    /// This can move a counter backwards and re-issue codes that already exist;
    /// it is meant for test fixtures and manual repair only.
    pub async fn reset_counter(&self, counter_name: &str, value: u64) -> CodeResult<()> {
        let name = CounterName::new(counter_name)?;
        if let Some(previous) = self.counters.current(&name).await?
            && previous > value
        {
            warn!(
                "Lowering counter {} from {} to {}; codes up to {} may be issued twice",
                name, previous, value, previous
            );
        }
        self.counters.set(&name, value).await?;
        info!("Counter {} set to {}", name, value);
        Ok(())
    }

    pub async fn counters(&self) -> CodeResult<Vec<Counter>> {
        self.counters.list().await
    }

    /// One counter by name, `None` if it has never been used
    pub async fn counter(&self, counter_name: &str) -> CodeResult<Option<Counter>> {
        let name = CounterName::new(counter_name)?;
        let value = self.counters.current(&name).await?;
        Ok(value.map(|value| Counter { name, value }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::CodeError;
    use crate::infrastructure::InMemoryCounterRepository;

    fn generator() -> SequentialCodeGenerator {
        SequentialCodeGenerator::new(Arc::new(InMemoryCounterRepository::new()))
    }

    #[tokio::test]
    async fn test_cold_start_quote_code() {
        let codes = generator();
        assert_eq!(codes.generate_quote_code().await.unwrap(), "COT-1");
    }

    #[tokio::test]
    async fn test_sequential_quote_codes() {
        let codes = generator();
        let mut issued = Vec::new();
        for _ in 0..3 {
            issued.push(codes.generate_quote_code().await.unwrap());
        }
        assert_eq!(issued, vec!["COT-1", "COT-2", "COT-3"]);
    }

    #[tokio::test]
    async fn test_sequences_are_independent() {
        let codes = generator();
        for _ in 0..3 {
            codes.generate_quote_code().await.unwrap();
        }
        assert_eq!(codes.generate_order_code().await.unwrap(), "ORD-1");
        assert_eq!(codes.generate_quote_code().await.unwrap(), "COT-4");
    }

    #[tokio::test]
    async fn test_reset_then_next() {
        let codes = generator();
        codes.reset_counter("order", 37).await.unwrap();
        assert_eq!(codes.generate_order_code().await.unwrap(), "ORD-38");
        assert_eq!(codes.current_value("order").await.unwrap(), Some(38));
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected() {
        let codes = generator();
        let err = codes.next_sequential_number("").await.unwrap_err();
        assert!(matches!(err, CodeError::InvalidCounterName { .. }));
        assert!(codes.counters().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counter_lookup_validates_name() {
        let codes = generator();
        codes.generate_order_code().await.unwrap();

        let order = codes.counter("order").await.unwrap().unwrap();
        assert_eq!(order.value, 1);
        assert_eq!(codes.counter("quote").await.unwrap(), None);
        assert!(matches!(
            codes.counter("ord er").await,
            Err(CodeError::InvalidCounterName { .. })
        ));
    }

    #[tokio::test]
    async fn test_arbitrary_counter_names() {
        let codes = generator();
        assert_eq!(codes.next_sequential_number("invoice").await.unwrap(), 1);
        assert_eq!(codes.next_sequential_number("invoice").await.unwrap(), 2);
        assert_eq!(codes.current_value("quote").await.unwrap(), None);
    }
}
