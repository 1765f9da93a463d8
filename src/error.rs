use thiserror::Error;

use crate::client::ClientError;
use crate::index::IndexError;
use crate::search::SearchError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Engine transport errors
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Index lifecycle and write errors
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Search pipeline errors
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::Client(_) => "ENGINE_ERROR",
            AppError::Index(IndexError::Locked { .. }) => "INDEX_LOCKED",
            AppError::Index(IndexError::BulkFailure { .. }) => "BULK_INDEX_FAILURE",
            AppError::Index(IndexError::DocumentNotFound { .. }) => "DOCUMENT_NOT_FOUND",
            AppError::Index(_) => "INDEX_ERROR",
            AppError::Search(SearchError::Validation(_)) => "VALIDATION_ERROR",
            AppError::Search(_) => "SEARCH_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
        }
    }

    /// Whether the caller should retry later rather than treat this as final
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Index(IndexError::Locked { .. }))
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
