//! Repository error types.

use thiserror::Error;

/// Errors from document collaborators.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested document was not found.
    #[error("document not found: {0}")]
    NotFound(String),

    /// A query could not be parsed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A document is missing its `_id` or is not an object.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// The backend could not serve the request.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;
