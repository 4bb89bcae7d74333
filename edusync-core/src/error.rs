//! Error types for the sync engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from a single remote API call.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Timeout, DNS or connection failure.
    #[error("network error: {0}")]
    Network(String),

    /// The remote answered with a non-success status.
    #[error("remote rejected request ({status}): {message}")]
    Rejection { status: u16, message: String },

    /// A success response whose body was not valid JSON.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl RemoteError {
    /// HTTP status for rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Rejection { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Snapshot read/write failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse snapshot {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The snapshot could not be loaded or saved.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// A single-record trigger named a collection that does not exist.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// A single-record trigger passed JSON that does not fit the collection.
    #[error("invalid {collection} record: {source}")]
    InvalidRecord {
        collection: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_status() {
        let err = RemoteError::Rejection {
            status: 404,
            message: "Not Found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "remote rejected request (404): Not Found");
    }

    #[test]
    fn test_network_has_no_status() {
        let err = RemoteError::Network("connection refused".to_string());
        assert_eq!(err.status(), None);
        assert!(!err.is_not_found());
    }
}
