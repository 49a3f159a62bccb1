use thiserror::Error;

use crate::bull::ValidationErrors;

/// Errors returned by the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bull {0} not found")]
    NotFound(i64),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("stored bull {id} is unreadable: {detail}")]
    Corrupt { id: i64, detail: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
