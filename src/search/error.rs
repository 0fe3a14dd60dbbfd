//! Error types for search operations

use crate::cpe::CpeError;
use crate::error::AppError;
use crate::search::document::IndexType;

/// Result type for index and search operations
pub type IndexResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Blank free-text query or an overly broad CPE pattern
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The index could not be opened, locked, read or written
    #[error("Index {index} unavailable: {reason}")]
    IndexUnavailable { index: String, reason: String },

    /// A full rebuild was aborted; the previous commit is still in place
    #[error("Reindex of {index} failed: {reason}")]
    ReindexFailed { index: IndexType, reason: String },

    /// A rebuild of the same index is already running
    #[error("Reindex of {0} already in progress")]
    ReindexInProgress(IndexType),

    /// An entity was handed to the index of another kind
    #[error("Schema mismatch: expected {expected} entity, got {actual}")]
    SchemaMismatch {
        expected: IndexType,
        actual: IndexType,
    },

    /// Malformed CPE name
    #[error("Invalid CPE: {0}")]
    InvalidCpe(#[from] CpeError),

    /// Persistence collaborator errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Tantivy error not covered by the variants above
    #[error("Tantivy error: {0}")]
    Tantivy(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    pub fn unavailable(index: impl ToString, reason: impl ToString) -> Self {
        SearchError::IndexUnavailable {
            index: index.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<tantivy::TantivyError> for SearchError {
    fn from(err: tantivy::TantivyError) -> Self {
        use tantivy::TantivyError;
        match err {
            TantivyError::LockFailure(..)
            | TantivyError::IoError(_)
            | TantivyError::DataCorruption(_)
            | TantivyError::OpenDirectoryError(_)
            | TantivyError::OpenReadError(_)
            | TantivyError::OpenWriteError(_) => SearchError::unavailable("index", err),
            _ => SearchError::Tantivy(err.to_string()),
        }
    }
}

impl From<AppError> for SearchError {
    fn from(err: AppError) -> Self {
        SearchError::Persistence(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidQuery(msg) => AppError::Validation(msg),
            SearchError::Io(err) => AppError::Io(err),
            _ => AppError::Search(err.to_string()),
        }
    }
}
