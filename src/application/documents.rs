use crate::application::code_generator::SequentialCodeGenerator;
use crate::domain::counter::{DocumentCode, DocumentKind};
use crate::domain::document::{Document, LineItem};
use crate::domain::repositories::{CodeResult, DocumentRepository};
use std::sync::Arc;
use tracing::{error, info};

/// Creates quotes and orders, each with a freshly issued code.
#[derive(Clone)]
pub struct DocumentService {
    codes: SequentialCodeGenerator,
    documents: Arc<dyn DocumentRepository>,
}

impl DocumentService {
    pub fn new(codes: SequentialCodeGenerator, documents: Arc<dyn DocumentRepository>) -> Self {
        Self { codes, documents }
    }

    pub async fn create_quote(&self, customer: &str, lines: Vec<LineItem>) -> CodeResult<Document> {
        self.create(DocumentKind::Quote, customer, lines).await
    }

    pub async fn create_order(&self, customer: &str, lines: Vec<LineItem>) -> CodeResult<Document> {
        self.create(DocumentKind::Order, customer, lines).await
    }

    /// Validate, take a code, persist.
    ///
    /// Input is validated before a number is consumed. Once the code is
    /// issued it is never handed back: if the insert fails the number stays
    /// burnt and no document exists.
    pub async fn create(
        &self,
        kind: DocumentKind,
        customer: &str,
        lines: Vec<LineItem>,
    ) -> CodeResult<Document> {
        let mut document = Document::draft(kind, customer, lines)?;
        let code = self.codes.generate_code(kind).await?;
        document.code = Some(code);

        if let Err(e) = self.documents.insert(&document).await {
            error!("Failed to persist {} {}; number {} is lost: {}", kind, code, code.number, e);
            return Err(e);
        }

        info!(
            "Created {} {} for {} (total {})",
            kind, code, document.customer, document.totals.total
        );
        Ok(document)
    }

    pub async fn find_by_code(&self, code: &str) -> CodeResult<Option<Document>> {
        let code: DocumentCode = code.parse()?;
        self.documents.find_by_code(&code).await
    }
}
