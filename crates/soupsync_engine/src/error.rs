//! Error types for the sync engine.

use soupsync_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The sync definition cannot be used as configured.
    #[error("configuration error: {0}")]
    Config(String),

    /// The local store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The remote source failed.
    #[error("remote error: {message}")]
    Remote {
        /// Error message.
        message: String,
        /// Whether the orchestration layer may retry the call.
        retryable: bool,
    },

    /// A fetched or stored record lacks a field the engine needs.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a malformed record error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRecord(message.into())
    }

    /// Creates a retryable remote error.
    pub fn remote_retryable(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable remote error.
    pub fn remote_fatal(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the failed call may be retried.
    ///
    /// The engine never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Remote { retryable: true, .. })
    }
}
