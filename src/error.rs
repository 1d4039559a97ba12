use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ValidationErrors> for JournalError {
    fn from(errors: ValidationErrors) -> Self {
        JournalError::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;
