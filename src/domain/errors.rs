use thiserror::Error;

/// Errors raised while issuing or assigning document codes
#[derive(Debug, Error)]
pub enum CodeError {
    #[error("Storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    #[error("Invalid counter name {name:?}: {reason}")]
    InvalidCounterName { name: String, reason: String },

    #[error("Invalid document code: {input:?}")]
    InvalidCode { input: String },

    #[error("Invalid document: {reason}")]
    InvalidDocument { reason: String },

    #[error("Counter {name} overflowed")]
    CounterOverflow { name: String },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CodeError {
    pub fn storage(reason: impl Into<String>) -> Self {
        CodeError::StorageUnavailable {
            reason: reason.into(),
        }
    }

    /// True when the failure came from the backing store rather than the caller's input.
    pub fn is_storage(&self) -> bool {
        matches!(self, CodeError::StorageUnavailable { .. })
    }
}

impl From<sqlx::Error> for CodeError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => CodeError::Conflict {
                reason: db.message().to_string(),
            },
            other => CodeError::StorageUnavailable {
                reason: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for CodeError {
    fn from(err: serde_json::Error) -> Self {
        CodeError::Serialization(err.to_string())
    }
}
