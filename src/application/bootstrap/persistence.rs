use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::application::backfill::CodeBackfill;
use crate::application::code_generator::SequentialCodeGenerator;
use crate::application::documents::DocumentService;
use crate::config::Config;
use crate::domain::repositories::{CounterRepository, DocumentRepository};
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::repositories::{
    SqliteCounterRepository, SqliteDocumentRepository,
};

pub struct PersistenceHandle {
    pub db: Database,
    pub counter_repository: Arc<dyn CounterRepository>,
    pub document_repository: Arc<dyn DocumentRepository>,
}

impl PersistenceHandle {
    pub fn code_generator(&self) -> SequentialCodeGenerator {
        SequentialCodeGenerator::new(self.counter_repository.clone())
    }

    pub fn document_service(&self) -> DocumentService {
        DocumentService::new(self.code_generator(), self.document_repository.clone())
    }

    pub fn backfill(&self) -> CodeBackfill {
        CodeBackfill::new(
            self.counter_repository.clone(),
            self.document_repository.clone(),
        )
    }
}

pub struct PersistenceBootstrap;

impl PersistenceBootstrap {
    pub async fn init(config: &Config) -> Result<PersistenceHandle> {
        info!("Initializing Database at {}", config.database.url);

        let db = Database::new(&config.database)
            .await
            .context("Failed to initialize database")?;

        Ok(Self::from_database(db))
    }

    pub fn from_database(db: Database) -> PersistenceHandle {
        let counter_repository = Arc::new(SqliteCounterRepository::new(db.clone()));
        let document_repository = Arc::new(SqliteDocumentRepository::new(db.clone()));

        PersistenceHandle {
            db,
            counter_repository,
            document_repository,
        }
    }
}
