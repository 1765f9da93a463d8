use thiserror::Error;

/// Errors raised by the engine transport layer
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection-level failure; the caller owns any retry policy
    #[error("Connection to search engine failed: {0}")]
    Connection(String),

    /// Request exceeded the configured timeout
    #[error("Search engine request timed out: {0}")]
    Timeout(String),

    /// 4xx response, surfaced with the body for caller interpretation
    #[error("Engine rejected request ({status}): {body}")]
    Request { status: u16, body: String },

    /// 5xx response
    #[error("Engine server error ({status}): {body}")]
    Server { status: u16, body: String },

    /// Leading-slash sub-path outside the allow-list
    #[error("Only allow-listed absolute paths are permitted, got {0:?}")]
    ForbiddenPath(String),

    /// Response body was not the JSON we expected
    #[error("Invalid JSON from engine: {0}")]
    Json(#[from] serde_json::Error),

    /// The configured base URL (or a derived URL) failed to parse
    #[error("Invalid engine URL: {0}")]
    Url(String),
}

impl ClientError {
    /// HTTP status of the response, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Request { status, .. } | ClientError::Server { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    /// Response body for error-class responses, empty otherwise
    pub fn body(&self) -> &str {
        match self {
            ClientError::Request { body, .. } | ClientError::Server { body, .. } => body,
            _ => "",
        }
    }
}

/// Result type for transport operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;
