//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQLite database reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A soup referenced by an operation or query is not registered.
    #[error("soup not found: {name}")]
    SoupNotFound {
        /// Name of the soup.
        name: String,
    },

    /// A smart query could not be translated or executed.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Description of the problem.
        message: String,
    },

    /// No entry exists for the given local row id.
    #[error("entry {entry_id} not found in soup {soup}")]
    RecordNotFound {
        /// Name of the soup.
        soup: String,
        /// The local row id that was not found.
        entry_id: i64,
    },

    /// More than one entry matched an upsert's external id.
    #[error("{count} entries in soup {soup} share {path} = {value}")]
    AmbiguousExternalId {
        /// Name of the soup.
        soup: String,
        /// The external id path.
        path: String,
        /// The external id value.
        value: String,
        /// Number of matching entries.
        count: usize,
    },

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a soup not found error.
    pub fn soup_not_found(name: impl Into<String>) -> Self {
        Self::SoupNotFound { name: name.into() }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }
}
