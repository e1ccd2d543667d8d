//! Journal error types.

use arkiv_core::OperationId;
use thiserror::Error;

/// Errors that can occur in journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    /// An operation with this id already exists.
    #[error("operation already exists: {0}")]
    AlreadyExists(OperationId),

    /// No operation with this id exists.
    #[error("operation not found: {0}")]
    NotFound(String),

    /// The durable write or its backup failed.
    #[error("journal database failure: {0}")]
    Database(String),

    /// A select query could not be parsed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The journal collection is not available for reads.
    #[error("journal collection unavailable: {0}")]
    CollectionUnavailable(String),

    /// An argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A bulk call stopped part-way; the first `applied` items are durable.
    #[error("bulk stopped after {applied} item(s): {source}")]
    Bulk {
        /// Number of items durably written and backed up.
        applied: usize,
        /// The failure of the first unapplied item.
        source: Box<JournalError>,
    },
}

/// Result type for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;
