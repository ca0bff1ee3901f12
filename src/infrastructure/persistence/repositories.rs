mod counter_repository;
mod document_repository;

pub use counter_repository::SqliteCounterRepository;
pub use document_repository::SqliteDocumentRepository;
