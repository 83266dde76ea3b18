use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Duplicate record: {message}")]
    Duplicate { message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl StoreError {
    pub fn database(message: impl Into<String>) -> Self {
        StoreError::Database {
            message: message.into(),
        }
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        StoreError::Duplicate {
            message: message.into(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
