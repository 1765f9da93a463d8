use thiserror::Error;

use crate::client::ClientError;

/// A single failed item from a bulk response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub id: String,
    pub error: String,
}

/// Errors raised by index operations and lifecycle management
#[derive(Error, Debug)]
pub enum IndexError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The index is write-blocked; retry later rather than treating this as
    /// data loss
    #[error("Index {index} is locked for writes")]
    Locked { index: String },

    /// Some bulk items failed for reasons other than locking or version
    /// conflicts
    #[error("Failed to index {} document(s): {}", failures.len(), summarize(failures))]
    BulkFailure { failures: Vec<FailedItem> },

    #[error("Document {id} not found")]
    DocumentNotFound { id: String },

    /// Permanent caller mistake, such as amending an undeclared field
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The engine broke the scroll protocol
    #[error("Scroll response did not contain a cursor token")]
    MissingScrollToken,

    /// A pre-alias index occupies the group's name
    #[error("There is an index called {0}; it must be migrated to the alias scheme first")]
    UnmigratedIndex(String),

    #[error("Unexpected engine response: {0}")]
    UnexpectedResponse(String),

    /// The population worker pool stopped before the producer finished
    #[error("Population aborted: {0}")]
    PopulationAborted(String),

    /// Reading a bulk input stream failed
    #[error("Failed to read bulk stream: {0}")]
    Stream(#[from] std::io::Error),
}

fn summarize(failures: &[FailedItem]) -> String {
    failures
        .iter()
        .take(5)
        .map(|f| f.id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for index operations
pub type IndexResult<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_failure_message_lists_ids() {
        let err = IndexError::BulkFailure {
            failures: vec![
                FailedItem {
                    id: "/a".to_string(),
                    error: "mapper_parsing_exception".to_string(),
                },
                FailedItem {
                    id: "/b".to_string(),
                    error: "mapper_parsing_exception".to_string(),
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("2 document(s)"));
        assert!(message.contains("/a, /b"));
    }
}
