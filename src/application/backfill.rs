//! Code backfill migration.
//!
//! Assigns codes to documents created before codes existed. The counter is
//! first raised past every code already stored, then each legacy document
//! draws its number from the same atomic increment live issuance uses. Live
//! orders created while the migration runs interleave with it instead of
//! colliding, and a run can be repeated without renumbering anything.

use crate::domain::counter::{DocumentCode, DocumentKind};
use crate::domain::repositories::{CodeResult, CounterRepository, DocumentRepository};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub kind: DocumentKind,
    /// Codes handed to legacy documents, oldest document first
    pub assigned: Vec<DocumentCode>,
    /// Counter value after the run
    pub counter_value: u64,
}

pub struct CodeBackfill {
    counters: Arc<dyn CounterRepository>,
    documents: Arc<dyn DocumentRepository>,
}

impl CodeBackfill {
    pub fn new(counters: Arc<dyn CounterRepository>, documents: Arc<dyn DocumentRepository>) -> Self {
        Self {
            counters,
            documents,
        }
    }

    /// Backfill quotes, then orders.
    pub async fn run(&self) -> CodeResult<Vec<BackfillReport>> {
        let mut reports = Vec::with_capacity(DocumentKind::ALL.len());
        for kind in DocumentKind::ALL {
            reports.push(self.run_kind(kind).await?);
        }
        Ok(reports)
    }

    pub async fn run_kind(&self, kind: DocumentKind) -> CodeResult<BackfillReport> {
        let counter = kind.counter_name();
        let pending = self.documents.find_without_code(kind).await?;
        let floor = self.floor(kind).await?;

        info!(
            "Backfilling {} {} documents starting after {}",
            pending.len(),
            kind,
            floor
        );
        if floor > 0 {
            self.counters.raise_to(&counter, floor).await?;
        }

        let mut assigned = Vec::with_capacity(pending.len());
        for document in pending {
            let number = self.counters.upsert_and_increment(&counter).await?;
            let code = DocumentCode::new(kind, number);

            if !self.documents.assign_code(document.id, &code).await? {
                warn!(
                    "Document {} was coded while the backfill ran; {} is unused",
                    document.id, code
                );
                continue;
            }
            debug!("Assigned {} to {}", code, document.id);
            assigned.push(code);
        }

        let counter_value = self.counters.current(&counter).await?.unwrap_or(0);
        info!(
            "Backfill for {} done: {} assigned, counter at {}",
            kind,
            assigned.len(),
            counter_value
        );

        Ok(BackfillReport {
            kind,
            assigned,
            counter_value,
        })
    }

    /// Raise every counter to the highest code already stored, without
    /// touching documents.
    pub async fn sync_counters(&self) -> CodeResult<Vec<BackfillReport>> {
        let mut reports = Vec::with_capacity(DocumentKind::ALL.len());
        for kind in DocumentKind::ALL {
            let counter = kind.counter_name();
            let highest = self.documents.max_code_number(kind).await?;
            let counter_value = if highest > 0 {
                self.counters.raise_to(&counter, highest).await?
            } else {
                self.counters.current(&counter).await?.unwrap_or(0)
            };
            info!("Counter for {} synced to {}", kind, counter_value);
            reports.push(BackfillReport {
                kind,
                assigned: Vec::new(),
                counter_value,
            });
        }
        Ok(reports)
    }

    async fn floor(&self, kind: DocumentKind) -> CodeResult<u64> {
        let highest_code = self.documents.max_code_number(kind).await?;
        let counter = self
            .counters
            .current(&kind.counter_name())
            .await?
            .unwrap_or(0);
        Ok(highest_code.max(counter))
    }
}
